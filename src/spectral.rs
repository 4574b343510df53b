//! Harmonic and spectral feature extraction
//!
//! Everything here consumes the frequency-domain half of a capture frame:
//! dB magnitudes per bin plus the bin width in Hz. Features:
//!
//! - Overtone amplitudes for harmonics 2..=8 relative to the fundamental
//! - Harmonic-to-noise ratio (HNR)
//! - Spectral centroid, slope and flatness
//! - Formants F1-F3 from a smoothed spectral envelope

use serde::{Deserialize, Serialize};

/// Fixed harmonic set analyzed for the overtone profile.
pub const OVERTONE_HARMONICS: std::ops::RangeInclusive<u32> = 2..=8;

/// Spectrum analysis stops here; voice information above is negligible.
const ANALYSIS_CEILING_HZ: f32 = 4000.0;

/// Lower edge of the spectral slope regression band.
const SLOPE_BAND_LOW_HZ: f32 = 60.0;

/// Highest harmonic considered when classifying HNR bins.
const HNR_MAX_HARMONIC: u32 = 12;

/// Relative level reported for overtones whose bin falls outside the spectrum.
const RELATIVE_DB_FLOOR: f32 = -80.0;

/// One harmonic overtone relative to the session fundamental.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Overtone {
    /// Harmonic number, 2..=8
    pub harmonic: u32,
    pub frequency_hz: f32,
    /// Linear amplitude relative to the fundamental, clamped to [0, 1]
    pub amplitude: f32,
    /// Level relative to the fundamental in dB
    pub relative_db: f32,
}

/// Formant estimate with a confidence reflecting how many of the three
/// resonances were actually located (vs. defaulted).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormantEstimate {
    pub f1_hz: f32,
    pub f2_hz: f32,
    pub f3_hz: f32,
    /// Fraction of F1-F3 found as real peaks, in [0, 1]
    pub confidence: f32,
}

impl Default for FormantEstimate {
    fn default() -> Self {
        Self {
            f1_hz: 500.0,
            f2_hz: 1500.0,
            f3_hz: 2500.0,
            confidence: 0.0,
        }
    }
}

fn bin_for(freq: f32, bin_hz: f32) -> usize {
    (freq / bin_hz).round() as usize
}

fn power(db: f32) -> f32 {
    10.0f32.powf(db / 10.0)
}

/// Amplitudes of harmonics 2..=8 relative to the fundamental.
///
/// Always returns exactly seven entries; harmonics whose bin falls outside
/// the spectrum get amplitude 0.
pub fn overtones(spectrum_db: &[f32], bin_hz: f32, f0: f32) -> Vec<Overtone> {
    let mut result = Vec::with_capacity(7);
    let fundamental_db = if f0 > 0.0 && bin_hz > 0.0 {
        let bin = bin_for(f0, bin_hz);
        spectrum_db.get(bin).copied()
    } else {
        None
    };

    for harmonic in OVERTONE_HARMONICS {
        let frequency_hz = f0.max(0.0) * harmonic as f32;
        let level = fundamental_db.and_then(|f_db| {
            let bin = bin_for(frequency_hz, bin_hz);
            spectrum_db.get(bin).map(|db| db - f_db)
        });
        match level {
            Some(relative_db) => result.push(Overtone {
                harmonic,
                frequency_hz,
                amplitude: 10.0f32.powf(relative_db / 20.0).clamp(0.0, 1.0),
                relative_db,
            }),
            None => result.push(Overtone {
                harmonic,
                frequency_hz,
                amplitude: 0.0,
                relative_db: RELATIVE_DB_FLOOR,
            }),
        }
    }
    result
}

/// Harmonic-to-noise ratio in dB, clamped to `ceiling_db`. Returns 0 when no
/// fundamental is available.
///
/// A bin below 4 kHz counts as harmonic when it lies within a tolerance
/// window of any of harmonics 1..=12 of `f0`; the window widens with the
/// harmonic index to absorb accumulating frequency error.
pub fn hnr_db(spectrum_db: &[f32], bin_hz: f32, f0: f32, ceiling_db: f32) -> f32 {
    if f0 <= 0.0 || bin_hz <= 0.0 || spectrum_db.is_empty() {
        return 0.0;
    }

    let mut harmonic_power = 0.0f32;
    let mut noise_power = 0.0f32;

    for (k, &db) in spectrum_db.iter().enumerate() {
        let freq = k as f32 * bin_hz;
        if freq > ANALYSIS_CEILING_HZ {
            break;
        }
        let p = power(db);
        let mut is_harmonic = false;
        for h in 1..=HNR_MAX_HARMONIC {
            let target = f0 * h as f32;
            if target > ANALYSIS_CEILING_HZ + bin_hz {
                break;
            }
            let tolerance = (f0 * (0.04 + 0.01 * h as f32)).max(bin_hz);
            if (freq - target).abs() <= tolerance {
                is_harmonic = true;
                break;
            }
        }
        if is_harmonic {
            harmonic_power += p;
        } else {
            noise_power += p;
        }
    }

    if harmonic_power <= 0.0 {
        return 0.0;
    }
    if noise_power <= f32::MIN_POSITIVE {
        return ceiling_db;
    }
    (10.0 * (harmonic_power / noise_power).log10()).min(ceiling_db)
}

/// Power-weighted mean frequency of the spectrum.
pub fn spectral_centroid_hz(spectrum_db: &[f32], bin_hz: f32) -> f32 {
    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    for (k, &db) in spectrum_db.iter().enumerate() {
        let p = power(db);
        weighted += p * k as f32 * bin_hz;
        total += p;
    }
    if total <= f32::MIN_POSITIVE {
        0.0
    } else {
        weighted / total
    }
}

/// Linear regression slope of dB vs. frequency over the 60 Hz - 4 kHz band,
/// in dB per Hz.
pub fn spectral_slope(spectrum_db: &[f32], bin_hz: f32) -> f32 {
    let mut n = 0.0f32;
    let mut sum_x = 0.0f32;
    let mut sum_y = 0.0f32;
    let mut sum_xy = 0.0f32;
    let mut sum_xx = 0.0f32;

    for (k, &db) in spectrum_db.iter().enumerate() {
        let freq = k as f32 * bin_hz;
        if freq < SLOPE_BAND_LOW_HZ {
            continue;
        }
        if freq > ANALYSIS_CEILING_HZ {
            break;
        }
        n += 1.0;
        sum_x += freq;
        sum_y += db;
        sum_xy += freq * db;
        sum_xx += freq * freq;
    }

    if n < 2.0 {
        return 0.0;
    }
    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() <= f32::MIN_POSITIVE {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

/// Spectral flatness: geometric mean over arithmetic mean of the power
/// spectrum, in [0, 1]. Near 1 for noise, near 0 for a tonal spectrum.
pub fn spectral_flatness(spectrum_db: &[f32]) -> f32 {
    if spectrum_db.is_empty() {
        return 0.0;
    }
    let n = spectrum_db.len() as f32;
    let mut log_sum = 0.0f32;
    let mut sum = 0.0f32;
    for &db in spectrum_db {
        let p = power(db).max(1e-12);
        log_sum += p.ln();
        sum += p;
    }
    let geometric = (log_sum / n).exp();
    let arithmetic = sum / n;
    if arithmetic <= f32::MIN_POSITIVE {
        return 0.0;
    }
    (geometric / arithmetic).clamp(0.0, 1.0)
}

/// Mean linear power of the bins in `[lo_hz, hi_hz)`.
pub fn band_power(spectrum_db: &[f32], bin_hz: f32, lo_hz: f32, hi_hz: f32) -> f32 {
    if bin_hz <= 0.0 {
        return 0.0;
    }
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for (k, &db) in spectrum_db.iter().enumerate() {
        let freq = k as f32 * bin_hz;
        if freq < lo_hz {
            continue;
        }
        if freq >= hi_hz {
            break;
        }
        sum += power(db);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Estimate formants F1-F3 from the spectral envelope.
///
/// The envelope is smoothed with a moving average sized to the fundamental's
/// bin spacing, which removes the harmonic comb while keeping the broader
/// vocal-tract resonance peaks. Missing formants fall back to neutral vowel
/// defaults and lower the confidence.
pub fn estimate_formants(spectrum_db: &[f32], bin_hz: f32, f0: f32) -> FormantEstimate {
    if f0 <= 0.0 || bin_hz <= 0.0 || spectrum_db.len() < 8 {
        return FormantEstimate::default();
    }

    // Window spanning roughly one harmonic spacing, odd so it stays centered
    let mut window = ((f0 / bin_hz).round() as usize).clamp(3, 51);
    if window % 2 == 0 {
        window += 1;
    }
    let half = window / 2;

    let smoothed: Vec<f32> = (0..spectrum_db.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(spectrum_db.len());
            spectrum_db[lo..hi].iter().sum::<f32>() / (hi - lo) as f32
        })
        .collect();

    // Local maxima in the formant search region
    let mut peaks: Vec<(f32, f32)> = Vec::new();
    for i in 1..smoothed.len() - 1 {
        let freq = i as f32 * bin_hz;
        if !(200.0..=ANALYSIS_CEILING_HZ).contains(&freq) {
            continue;
        }
        if smoothed[i] > smoothed[i - 1] && smoothed[i] >= smoothed[i + 1] {
            peaks.push((freq, smoothed[i]));
        }
    }

    let strongest_in = |lo: f32, hi: f32| -> Option<f32> {
        peaks
            .iter()
            .filter(|(f, _)| *f >= lo && *f <= hi)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, _)| *f)
    };

    let mut found = 0u32;
    let f1 = match strongest_in(200.0, 900.0) {
        Some(f) => {
            found += 1;
            f
        }
        None => 500.0,
    };
    let f2 = match strongest_in(800.0f32.max(f1 + 200.0), 2800.0) {
        Some(f) => {
            found += 1;
            f
        }
        None => 1500.0,
    };
    let f3 = match strongest_in(1500.0f32.max(f2 + 300.0), 3500.0) {
        Some(f) => {
            found += 1;
            f
        }
        None => 2500.0,
    };

    FormantEstimate {
        f1_hz: f1,
        f2_hz: f2,
        f3_hz: f3,
        confidence: found as f32 / 3.0,
    }
}
