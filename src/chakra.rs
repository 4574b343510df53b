//! Composite resonance scoring
//!
//! Maps the session biomarkers onto seven fixed bands. Each band has a
//! documented weight vector over normalized inputs; weights per band sum to
//! 1.0 and are checked when a session is created. Raw composites in [0, 1]
//! are scaled to 0-100, stretched away from the 50 midpoint for perceptual
//! differentiation, then clamped to the configured floor/ceiling so the
//! output never claims certainty in either direction.
//!
//! A lightweight per-tick variant scores bands from spectral band energy
//! alone, cheap enough to run on every frame for live display.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::spectral;

/// The seven fixed classification bands, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChakraBand {
    Root,
    Sacral,
    SolarPlexus,
    Heart,
    Throat,
    ThirdEye,
    Crown,
}

impl ChakraBand {
    pub const ALL: [ChakraBand; 7] = [
        ChakraBand::Root,
        ChakraBand::Sacral,
        ChakraBand::SolarPlexus,
        ChakraBand::Heart,
        ChakraBand::Throat,
        ChakraBand::ThirdEye,
        ChakraBand::Crown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChakraBand::Root => "Root",
            ChakraBand::Sacral => "Sacral",
            ChakraBand::SolarPlexus => "Solar Plexus",
            ChakraBand::Heart => "Heart",
            ChakraBand::Throat => "Throat",
            ChakraBand::ThirdEye => "Third Eye",
            ChakraBand::Crown => "Crown",
        }
    }

    /// Spectral range the band draws from in the live display variant.
    pub fn frequency_range_hz(self) -> (f32, f32) {
        match self {
            ChakraBand::Root => (50.0, 150.0),
            ChakraBand::Sacral => (150.0, 250.0),
            ChakraBand::SolarPlexus => (250.0, 350.0),
            ChakraBand::Heart => (350.0, 450.0),
            ChakraBand::Throat => (450.0, 550.0),
            ChakraBand::ThirdEye => (550.0, 700.0),
            ChakraBand::Crown => (700.0, 900.0),
        }
    }

    fn index(self) -> usize {
        ChakraBand::ALL.iter().position(|b| *b == self).unwrap_or(0)
    }
}

/// One scored band with its qualitative tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChakraScore {
    pub band: ChakraBand,
    pub name: String,
    /// Composite score, clamped to the configured floor/ceiling
    pub score: f32,
    pub label: String,
    pub description: String,
}

/// Raw biomarker values feeding the scorer. Normalization happens inside.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInputs {
    pub fundamental_hz: f32,
    /// Tonal stability in [0, 1]
    pub stability: f32,
    /// Mean overtone amplitude in [0, 1]
    pub mean_overtone_amplitude: f32,
    pub jitter_relative_percent: f32,
    pub shimmer_db: f32,
    pub hnr_db: f32,
    pub spectral_centroid_hz: f32,
    pub spectral_slope_db_per_hz: f32,
    /// Formant detection confidence in [0, 1]
    pub formant_confidence: f32,
}

/// Normalized scorer inputs, each clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Jitter,
    Shimmer,
    Hnr,
    Stability,
    Richness,
    Centroid,
    Slope,
    Formants,
    LowPitch,
    MidPitch,
    HighPitch,
}

/// Per-band weight vectors. Each must sum to 1.0; `validate_weights`
/// enforces that at session construction and in tests.
const BAND_WEIGHTS: [(ChakraBand, &[(Input, f32)]); 7] = [
    (
        ChakraBand::Root,
        &[
            (Input::LowPitch, 0.35),
            (Input::Stability, 0.25),
            (Input::Hnr, 0.20),
            (Input::Jitter, 0.20),
        ],
    ),
    (
        ChakraBand::Sacral,
        &[
            (Input::LowPitch, 0.20),
            (Input::Shimmer, 0.25),
            (Input::Richness, 0.25),
            (Input::Stability, 0.15),
            (Input::Hnr, 0.15),
        ],
    ),
    (
        ChakraBand::SolarPlexus,
        &[
            (Input::MidPitch, 0.30),
            (Input::Hnr, 0.25),
            (Input::Jitter, 0.25),
            (Input::Centroid, 0.20),
        ],
    ),
    (
        ChakraBand::Heart,
        &[
            (Input::MidPitch, 0.25),
            (Input::Richness, 0.30),
            (Input::Shimmer, 0.20),
            (Input::Stability, 0.25),
        ],
    ),
    (
        ChakraBand::Throat,
        &[
            (Input::Stability, 0.30),
            (Input::Jitter, 0.25),
            (Input::Hnr, 0.25),
            (Input::MidPitch, 0.20),
        ],
    ),
    (
        ChakraBand::ThirdEye,
        &[
            (Input::HighPitch, 0.30),
            (Input::Centroid, 0.30),
            (Input::Richness, 0.20),
            (Input::Formants, 0.20),
        ],
    ),
    (
        ChakraBand::Crown,
        &[
            (Input::HighPitch, 0.35),
            (Input::Centroid, 0.25),
            (Input::Slope, 0.20),
            (Input::Formants, 0.20),
        ],
    ),
];

/// Tier descriptions, indexed by band then tier (Strong, Balanced, Gentle, Quiet).
const DESCRIPTIONS: [[&str; 4]; 7] = [
    [
        "Your foundation resonates with depth and steadiness.",
        "A grounded base supports your tone.",
        "A soft anchor hums beneath your voice.",
        "Your foundation rests quietly, waiting to be woken.",
    ],
    [
        "Warm, flowing energy moves freely through your sound.",
        "A steady current of warmth carries your tone.",
        "A gentle warmth ripples under the surface.",
        "The creative current is still and quiet for now.",
    ],
    [
        "Clear, confident power radiates from your core.",
        "Your center holds a calm, even strength.",
        "A mild glow of willpower flickers in your tone.",
        "Your inner fire is banked low and resting.",
    ],
    [
        "Rich overtones open your sound wide with warmth.",
        "An even, open warmth colors your voice.",
        "A tender openness softens your tone.",
        "The heart of your sound stays hushed and held in.",
    ],
    [
        "Your voice carries with striking steadiness and clarity.",
        "Expression flows evenly and without strain.",
        "Your expression comes through quietly but truly.",
        "Your voice is holding back more than it releases.",
    ],
    [
        "Bright upper resonance sharpens your inner focus.",
        "A clear brightness balances your perception.",
        "A faint shimmer of clarity sits high in your sound.",
        "The higher registers remain dim and undisturbed.",
    ],
    [
        "Luminous high harmonics crown your whole tone.",
        "A light, open quality lifts the top of your sound.",
        "A whisper of brilliance touches your upper range.",
        "The crown of your sound is silent and spacious.",
    ],
];

fn clamp01(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fixed linear normalizations against documented physiological ranges.
fn normalize(inputs: &ScoreInputs, which: Input) -> f32 {
    let f0 = inputs.fundamental_hz;
    match which {
        // 0% jitter -> 1.0 (steady), 2%+ -> 0.0
        Input::Jitter => clamp01(1.0 - inputs.jitter_relative_percent / 2.0),
        // 0 dB shimmer -> 1.0, 1 dB+ -> 0.0
        Input::Shimmer => clamp01(1.0 - inputs.shimmer_db),
        // 5 dB -> 0.0, 35 dB -> 1.0
        Input::Hnr => clamp01((inputs.hnr_db - 5.0) / 30.0),
        Input::Stability => clamp01(inputs.stability),
        Input::Richness => clamp01(inputs.mean_overtone_amplitude),
        // 100 Hz -> 0.0, 900 Hz -> 1.0
        Input::Centroid => clamp01((inputs.spectral_centroid_hz - 100.0) / 800.0),
        // -0.03 dB/Hz (dark) -> 0.0, flat -> 1.0
        Input::Slope => clamp01(1.0 + inputs.spectral_slope_db_per_hz / 0.03),
        Input::Formants => clamp01(inputs.formant_confidence),
        // Fundamental-position proxies; all zero without a fundamental
        Input::LowPitch => {
            if f0 <= 0.0 {
                0.0
            } else {
                clamp01((330.0 - f0) / 220.0)
            }
        }
        Input::MidPitch => {
            if f0 <= 0.0 {
                0.0
            } else {
                clamp01(1.0 - (f0 - 220.0).abs() / 180.0)
            }
        }
        Input::HighPitch => {
            if f0 <= 0.0 {
                0.0
            } else {
                clamp01((f0 - 220.0) / 330.0)
            }
        }
    }
}

fn tier(score: f32) -> usize {
    if score > 75.0 {
        0
    } else if score > 50.0 {
        1
    } else if score > 30.0 {
        2
    } else {
        3
    }
}

fn label_for(t: usize) -> &'static str {
    ["Strong", "Balanced", "Gentle", "Quiet"][t]
}

/// Check that every band's weight vector sums to 1.0.
pub fn validate_weights() -> Result<(), AnalysisError> {
    for (band, weights) in BAND_WEIGHTS {
        let sum: f32 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-4 {
            return Err(AnalysisError::InvalidConfig(format!(
                "weights for {} sum to {sum}, expected 1.0",
                band.name()
            )));
        }
    }
    Ok(())
}

/// Score all seven bands from session biomarkers.
pub fn score_bands(inputs: &ScoreInputs, config: &AnalysisConfig) -> Vec<ChakraScore> {
    debug_assert!(validate_weights().is_ok());

    BAND_WEIGHTS
        .iter()
        .map(|(band, weights)| {
            let raw: f32 = weights
                .iter()
                .map(|(input, weight)| normalize(inputs, *input) * weight)
                .sum();
            let scaled = raw * 100.0;
            let spread = 50.0 + (scaled - 50.0) * config.spread_factor;
            let score = spread.clamp(config.score_floor, config.score_ceiling);
            let t = tier(score);
            ChakraScore {
                band: *band,
                name: band.name().to_string(),
                score,
                label: label_for(t).to_string(),
                description: DESCRIPTIONS[band.index()][t].to_string(),
            }
        })
        .collect()
}

/// The band with the highest composite score.
pub fn dominant_band(scores: &[ChakraScore]) -> ChakraBand {
    scores
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|s| s.band)
        .unwrap_or(ChakraBand::Root)
}

/// Lightweight per-tick band levels from spectral band energy only, each in
/// [0, 1] relative to the strongest band. Cheap enough for every frame.
pub fn live_band_levels(spectrum_db: &[f32], bin_hz: f32) -> [f32; 7] {
    let mut levels = [0.0f32; 7];
    for (i, band) in ChakraBand::ALL.iter().enumerate() {
        let (lo, hi) = band.frequency_range_hz();
        levels[i] = spectral::band_power(spectrum_db, bin_hz, lo, hi);
    }
    let max = levels.iter().cloned().fold(0.0f32, f32::max);
    if max > f32::MIN_POSITIVE {
        for level in &mut levels {
            *level /= max;
        }
    }
    levels
}
