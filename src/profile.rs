//! Session-level profile types
//!
//! `VoiceProfile` holds the clinically-inspired biomarkers aggregated over a
//! session; `FrequencyProfile` is the top-level immutable result handed to
//! the presentation layer. Both are plain serializable data with no live
//! resources, so they can be stored, diffed or transmitted freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chakra::{ChakraBand, ChakraScore};
use crate::notes::{CompanionTone, NoteReading};
use crate::perturbation::{Jitter, Shimmer};
use crate::spectral::{FormantEstimate, Overtone};

/// Fundamental frequency statistics over the valid readings of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalStats {
    pub mean_hz: f32,
    pub stddev_hz: f32,
    pub min_hz: f32,
    pub max_hz: f32,
}

/// Pitch excursion over the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchRange {
    pub semitones: f32,
    pub hz: f32,
}

/// Aggregated voice-quality biomarkers for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub fundamental: FundamentalStats,
    pub jitter: Jitter,
    pub shimmer: Shimmer,
    pub hnr_db: f32,
    pub formants: FormantEstimate,
    pub spectral_centroid_hz: f32,
    pub spectral_slope_db_per_hz: f32,
    /// Mean frame RMS over the session
    pub rms_energy: f32,
    /// Spread between the quietest and loudest voiced frames in dB
    pub dynamic_range_db: f32,
    pub pitch_range: PitchRange,
    /// Number of accepted glottal cycles
    pub cycle_count: usize,
    /// Fraction of analyzed frames with a confident pitch
    pub voiced_ratio: f32,
    /// Set when the voiced ratio fell below the configured cutoff
    pub low_confidence: bool,
}

/// The finished, immutable session result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyProfile {
    pub id: Uuid,
    /// Session fundamental in Hz, 0 when no voice was detected
    pub fundamental_hz: f32,
    /// Nearest note, absent when there is no fundamental
    pub note: Option<NoteReading>,
    pub dominant_band: ChakraBand,
    /// Tonal stability in [0, 1]
    pub stability: f32,
    /// Averaged overtone snapshot, harmonics 2..=8
    pub overtones: Vec<Overtone>,
    /// Rounded mean overtone amplitude, 0..=100
    pub richness: u32,
    pub voice: VoiceProfile,
    pub chakra_scores: Vec<ChakraScore>,
    pub companion_tones: Vec<CompanionTone>,
    pub created_at: DateTime<Utc>,
}

/// Tonal stability over a pitch reading sequence: `clamp01(1 - 10 * CV)`
/// where CV is the coefficient of variation of the valid (positive)
/// readings. Fewer than two valid readings yield 0.
pub fn stability(readings: &[f32]) -> f32 {
    let valid: Vec<f32> = readings.iter().copied().filter(|r| *r > 0.0).collect();
    if valid.len() < 2 {
        return 0.0;
    }
    let mean = valid.iter().sum::<f32>() / valid.len() as f32;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = valid.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / valid.len() as f32;
    let cv = variance.sqrt() / mean;
    (1.0 - 10.0 * cv).clamp(0.0, 1.0)
}

/// Mean / stddev / min / max over valid (positive) readings.
pub fn fundamental_stats(readings: &[f32]) -> FundamentalStats {
    let valid: Vec<f32> = readings.iter().copied().filter(|r| *r > 0.0).collect();
    if valid.is_empty() {
        return FundamentalStats::default();
    }
    let mean = valid.iter().sum::<f32>() / valid.len() as f32;
    let variance = valid.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / valid.len() as f32;
    let min = valid.iter().copied().fold(f32::INFINITY, f32::min);
    let max = valid.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    FundamentalStats {
        mean_hz: mean,
        stddev_hz: variance.sqrt(),
        min_hz: min,
        max_hz: max,
    }
}

/// Pitch excursion in semitones and Hz over valid readings.
pub fn pitch_range(readings: &[f32]) -> PitchRange {
    let stats = fundamental_stats(readings);
    if stats.min_hz <= 0.0 || stats.max_hz <= 0.0 {
        return PitchRange::default();
    }
    PitchRange {
        semitones: 12.0 * (stats.max_hz / stats.min_hz).log2(),
        hz: stats.max_hz - stats.min_hz,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stability_empty_is_zero() {
        assert_eq!(stability(&[]), 0.0);
    }

    #[test]
    fn test_stability_all_sentinels_is_zero() {
        assert_eq!(stability(&[-1.0, -1.0, -1.0]), 0.0);
        assert_eq!(stability(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_stability_steady_tone_near_one() {
        let readings = vec![440.0f32; 30];
        assert!((stability(&readings) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stability_wild_tone_low() {
        let readings: Vec<f32> = (0..30).map(|i| if i % 2 == 0 { 100.0 } else { 500.0 }).collect();
        assert!(stability(&readings) < 0.3);
    }

    #[test]
    fn test_stability_single_reading_is_zero() {
        assert_eq!(stability(&[440.0]), 0.0);
    }

    #[test]
    fn test_stability_ignores_sentinels_between_valid() {
        let readings = vec![440.0, -1.0, 440.0, -1.0, 440.0];
        assert!((stability(&readings) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fundamental_stats_filters_sentinels() {
        let stats = fundamental_stats(&[-1.0, 430.0, -1.0, 450.0]);
        assert!((stats.mean_hz - 440.0).abs() < 1e-3);
        assert_eq!(stats.min_hz, 430.0);
        assert_eq!(stats.max_hz, 450.0);
        assert!((stats.stddev_hz - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_fundamental_stats_empty() {
        assert_eq!(fundamental_stats(&[]), FundamentalStats::default());
        assert_eq!(fundamental_stats(&[-1.0]), FundamentalStats::default());
    }

    #[test]
    fn test_pitch_range_octave_is_twelve_semitones() {
        let range = pitch_range(&[220.0, 330.0, 440.0]);
        assert!((range.semitones - 12.0).abs() < 1e-3);
        assert!((range.hz - 220.0).abs() < 1e-3);
    }

    #[test]
    fn test_pitch_range_no_valid_readings() {
        assert_eq!(pitch_range(&[-1.0, 0.0]), PitchRange::default());
    }
}
