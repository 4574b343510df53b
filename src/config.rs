//! Analysis configuration
//!
//! Every threshold in the pipeline is a tuned heuristic, not a first-principles
//! contract, so all of them live here rather than as hardcoded constants.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Configuration for a voice analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Lower bound of the pitch search range in Hz
    pub min_pitch_hz: f32,
    /// Upper bound of the pitch search range in Hz
    pub max_pitch_hz: f32,
    /// Frames with RMS below this are treated as silence
    pub noise_floor_rms: f32,
    /// Minimum normalized autocorrelation peak (peak / frame length)
    /// for a pitch reading to count
    pub confidence_threshold: f32,
    /// Spectral flatness above this suppresses a positive pitch reading
    /// (flatness near 1.0 means noise, not tone)
    pub flatness_noise_threshold: f32,

    /// Ratio band vs. the rolling median that flags a halved octave error
    pub octave_halving_band: (f32, f32),
    /// Ratio band vs. the rolling median that flags a doubled octave error
    pub octave_doubling_band: (f32, f32),
    /// Number of recent valid readings kept for the rolling median
    pub median_window: usize,

    /// Accepted glottal cycle length as a multiple of the period implied
    /// by the concurrent fundamental
    pub cycle_tolerance: (f32, f32),

    /// Ceiling applied to the harmonic-to-noise ratio in dB
    pub hnr_ceiling_db: f32,

    /// Sessions with a voiced-frame ratio below this are flagged
    /// low-confidence (the profile is still produced)
    pub voice_validity_cutoff: f32,

    /// Composite scores are stretched away from the 50 midpoint by this factor
    pub spread_factor: f32,
    /// Lower clamp for composite scores
    pub score_floor: f32,
    /// Upper clamp for composite scores
    pub score_ceiling: f32,

    /// Run the expensive pitch/cycle stage every Nth tick (1 = every tick)
    pub expensive_stage_interval: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_pitch_hz: 50.0,
            max_pitch_hz: 600.0,
            noise_floor_rms: 0.01,
            confidence_threshold: 0.30,
            flatness_noise_threshold: 0.5,
            octave_halving_band: (0.4, 0.6),
            octave_doubling_band: (1.8, 2.2),
            median_window: 5,
            cycle_tolerance: (0.7, 1.4),
            hnr_ceiling_db: 40.0,
            voice_validity_cutoff: 0.2,
            spread_factor: 1.4,
            score_floor: 5.0,
            score_ceiling: 98.0,
            expensive_stage_interval: 2,
        }
    }
}

impl AnalysisConfig {
    /// Validate internal consistency. Called when a session is created.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.min_pitch_hz <= 0.0 || self.max_pitch_hz <= self.min_pitch_hz {
            return Err(AnalysisError::InvalidConfig(format!(
                "pitch range {}..{} Hz is not ordered and positive",
                self.min_pitch_hz, self.max_pitch_hz
            )));
        }
        if self.noise_floor_rms < 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "noise floor must be non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AnalysisError::InvalidConfig(
                "confidence threshold must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.flatness_noise_threshold) {
            return Err(AnalysisError::InvalidConfig(
                "flatness threshold must be in [0, 1]".into(),
            ));
        }
        for (label, band) in [
            ("octave halving", self.octave_halving_band),
            ("octave doubling", self.octave_doubling_band),
            ("cycle tolerance", self.cycle_tolerance),
        ] {
            if band.0 <= 0.0 || band.1 <= band.0 {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{label} band {:?} is not ordered and positive",
                    band
                )));
            }
        }
        if self.median_window == 0 {
            return Err(AnalysisError::InvalidConfig(
                "median window must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.voice_validity_cutoff) {
            return Err(AnalysisError::InvalidConfig(
                "voice validity cutoff must be in [0, 1]".into(),
            ));
        }
        if self.spread_factor < 1.0 {
            return Err(AnalysisError::InvalidConfig(
                "spread factor must be at least 1.0".into(),
            ));
        }
        if self.score_floor < 0.0 || self.score_ceiling > 100.0 || self.score_ceiling <= self.score_floor {
            return Err(AnalysisError::InvalidConfig(format!(
                "score clamp {}..{} must be ordered within 0..100",
                self.score_floor, self.score_ceiling
            )));
        }
        if self.expensive_stage_interval == 0 {
            return Err(AnalysisError::InvalidConfig(
                "expensive stage interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
