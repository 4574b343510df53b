//! Glottal cycle extraction
//!
//! Segments a frame into vocal-fold vibration cycles using positive-going
//! zero crossings, validated against the period implied by the concurrent
//! fundamental. Crossings are located with linear interpolation so the
//! recovered periods are sub-sample accurate.

use serde::{Deserialize, Serialize};

/// One vocal-fold vibration period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlottalCycle {
    pub period_samples: f32,
    pub period_seconds: f32,
    pub peak_amplitude: f32,
}

/// Extract the glottal cycles present in `samples`.
///
/// A candidate interval between consecutive positive-going zero crossings is
/// accepted only if its length falls within `tolerance` (as a multiple of the
/// period implied by `fundamental_hz`). Returns an empty vector when
/// `fundamental_hz` is not positive; never fails.
pub fn extract_cycles(
    samples: &[f32],
    sample_rate: f32,
    fundamental_hz: f32,
    tolerance: (f32, f32),
) -> Vec<GlottalCycle> {
    if fundamental_hz <= 0.0 || sample_rate <= 0.0 || samples.len() < 2 {
        return Vec::new();
    }

    let expected_period = sample_rate / fundamental_hz;
    let min_period = expected_period * tolerance.0;
    let max_period = expected_period * tolerance.1;

    let mut cycles = Vec::new();
    let mut prev_crossing: Option<f32> = None;
    let mut prev_index: Option<usize> = None;

    for i in 0..samples.len() - 1 {
        let (a, b) = (samples[i], samples[i + 1]);
        if a < 0.0 && b >= 0.0 {
            // Sub-sample crossing position via linear interpolation
            let crossing = i as f32 + a / (a - b);
            if let (Some(prev), Some(start)) = (prev_crossing, prev_index) {
                let period_samples = crossing - prev;
                if period_samples >= min_period && period_samples <= max_period {
                    let peak_amplitude = samples[start..=i]
                        .iter()
                        .fold(0.0f32, |peak, s| peak.max(s.abs()));
                    cycles.push(GlottalCycle {
                        period_samples,
                        period_seconds: period_samples / sample_rate,
                        peak_amplitude,
                    });
                }
            }
            prev_crossing = Some(crossing);
            prev_index = Some(i);
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: f32 = 44100.0;
    const TOLERANCE: (f32, f32) = (0.7, 1.4);

    fn generate_sine(freq: f32, amplitude: f32, samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE;
                (2.0 * PI * freq * t).sin() * amplitude
            })
            .collect()
    }

    #[test]
    fn test_clean_sine_periods_match_fundamental() {
        let samples = generate_sine(220.0, 0.8, 4096);
        let cycles = extract_cycles(&samples, SAMPLE_RATE, 220.0, TOLERANCE);
        assert!(cycles.len() >= 15, "expected many cycles, got {}", cycles.len());

        let expected = 1.0 / 220.0;
        for cycle in &cycles {
            let err = (cycle.period_seconds - expected).abs() / expected;
            assert!(err < 0.002, "period off by {:.4}%", err * 100.0);
            assert!((cycle.peak_amplitude - 0.8).abs() < 0.05);
        }
    }

    #[test]
    fn test_mismatched_fundamental_rejects_all_cycles() {
        // Actual tone at 220 Hz, claimed fundamental at 500 Hz: cycle lengths
        // are ~2.3x the implied period, outside the tolerance band.
        let samples = generate_sine(220.0, 0.8, 4096);
        let cycles = extract_cycles(&samples, SAMPLE_RATE, 500.0, TOLERANCE);
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_zero_fundamental_returns_empty() {
        let samples = generate_sine(220.0, 0.8, 1024);
        assert!(extract_cycles(&samples, SAMPLE_RATE, 0.0, TOLERANCE).is_empty());
        assert!(extract_cycles(&samples, SAMPLE_RATE, -100.0, TOLERANCE).is_empty());
    }

    #[test]
    fn test_silence_returns_empty() {
        let samples = vec![0.0; 1024];
        assert!(extract_cycles(&samples, SAMPLE_RATE, 220.0, TOLERANCE).is_empty());
    }
}
