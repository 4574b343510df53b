//! Error types for the analysis pipeline.
//!
//! Degraded signal (silence, low confidence, too little data) is never an
//! error here - those conditions become quantitative values downstream
//! (`None` pitch readings, zeroed perturbation results, low validity ratios).
//! `AnalysisError` covers programming-contract violations only.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    #[error("spectrum has {got} bins, expected {expected} for the configured FFT size")]
    SpectrumLengthMismatch { expected: usize, got: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
}
