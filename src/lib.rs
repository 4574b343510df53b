//! Voice resonance analysis for sustained vocal tones.
//!
//! Takes ~15 seconds of a held tone and produces a frequency profile:
//! fundamental pitch and stability, overtone structure, voice-quality
//! biomarkers (jitter, shimmer, HNR, formants) and a seven-band resonance
//! score composite. Everything runs synchronously on the caller's thread;
//! the embedding application drives `SessionAnalyzer` from its capture
//! callback and reads back `LiveSnapshot`s for display.
//!
//! Pipeline:
//!
//! ```text
//!   SampleFrame (samples + dB spectrum)
//!        |
//!        v
//!   +----------------+     +-----------------+     +------------------+
//!   | PitchEstimator | --> | octave/flatness | --> | glottal cycles   |
//!   | (autocorr)     |     | gates           |     | jitter / shimmer |
//!   +----------------+     +-----------------+     +------------------+
//!        |                                               |
//!        v                                               v
//!   +----------------+     +-----------------+     +------------------+
//!   | overtones, HNR | --> | SessionAnalyzer | --> | FrequencyProfile |
//!   | centroid/slope |     | (accumulation)  |     | + chakra scores  |
//!   +----------------+     +-----------------+     +------------------+
//! ```

pub mod chakra;
pub mod config;
pub mod error;
pub mod frame;
pub mod glottal;
pub mod notes;
pub mod perturbation;
pub mod pitch;
pub mod profile;
pub mod session;
pub mod spectral;
pub mod spectrum;

pub use chakra::{ChakraBand, ChakraScore, ScoreInputs};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use frame::SampleFrame;
pub use glottal::GlottalCycle;
pub use notes::{CompanionTone, NoteReading};
pub use perturbation::{Jitter, Shimmer};
pub use pitch::PitchEstimator;
pub use profile::{FrequencyProfile, FundamentalStats, PitchRange, VoiceProfile};
pub use session::{DecimationPolicy, LiveSnapshot, SessionAnalyzer, SessionState};
pub use spectral::{FormantEstimate, Overtone};
pub use spectrum::SpectrumAnalyzer;
