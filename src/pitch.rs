//! Per-frame fundamental frequency estimation
//!
//! ## Algorithm
//! 1. Gate on frame RMS - below the noise floor there is nothing to track
//! 2. Normalize samples by RMS so the confidence measure is level-independent
//! 3. Autocorrelate over the bounded lag range implied by the pitch search
//!    range (50-600 Hz by default), never over all lags
//! 4. Walk past the first dip, then take the first peak after it - this
//!    skips the trivial short-lag region without ever visiting lag zero
//! 5. Confidence = peak value / frame length (a normalized signal's zero-lag
//!    autocorrelation equals the frame length); gate on it
//! 6. Parabolic interpolation around the winning lag for sub-sample accuracy
//!
//! Octave-error rejection and spectral-flatness gating are session-level
//! concerns applied by the caller, not here.

use crate::config::AnalysisConfig;
use crate::frame;

/// Autocorrelation pitch detector with reusable scratch buffers.
///
/// The scratch buffers are exclusively owned by the estimator and overwritten
/// on every call, so a steady-state session performs no per-tick allocation.
pub struct PitchEstimator {
    min_pitch_hz: f32,
    max_pitch_hz: f32,
    noise_floor_rms: f32,
    confidence_threshold: f32,
    normalized: Vec<f32>,
    autocorr: Vec<f32>,
}

impl PitchEstimator {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            min_pitch_hz: config.min_pitch_hz,
            max_pitch_hz: config.max_pitch_hz,
            noise_floor_rms: config.noise_floor_rms,
            confidence_threshold: config.confidence_threshold,
            normalized: Vec::new(),
            autocorr: Vec::new(),
        }
    }

    /// Estimate the fundamental frequency of one frame.
    ///
    /// Returns `None` (the sentinel) for silence, low-confidence frames and
    /// candidates outside the search range. Never fails.
    pub fn estimate(&mut self, samples: &[f32], sample_rate: f32) -> Option<f32> {
        let n = samples.len();
        if n < 2 || sample_rate <= 0.0 {
            return None;
        }

        let level = frame::rms(samples);
        if level < self.noise_floor_rms {
            return None;
        }

        self.normalized.clear();
        self.normalized.extend(samples.iter().map(|s| s / level));

        let min_lag = ((sample_rate / self.max_pitch_hz).floor() as usize).max(1);
        let max_lag = ((sample_rate / self.min_pitch_hz).ceil() as usize).min(n - 1);
        if max_lag <= min_lag {
            return None;
        }

        self.autocorr.clear();
        for lag in min_lag..=max_lag {
            let mut sum = 0.0f32;
            for i in 0..(n - lag) {
                sum += self.normalized[i] * self.normalized[i + lag];
            }
            self.autocorr.push(sum);
        }

        // Walk down into the first dip, then up to the first peak after it.
        let ac = &self.autocorr;
        let mut i = 0usize;
        while i + 1 < ac.len() && ac[i + 1] <= ac[i] {
            i += 1;
        }
        while i + 1 < ac.len() && ac[i + 1] >= ac[i] {
            i += 1;
        }
        let best = i;

        let confidence = ac[best] / n as f32;
        if confidence < self.confidence_threshold {
            return None;
        }

        let mut refined_lag = (min_lag + best) as f32;
        if best > 0 && best + 1 < ac.len() {
            let (y1, y2, y3) = (ac[best - 1], ac[best], ac[best + 1]);
            let denom = 2.0 * (2.0 * y2 - y1 - y3);
            if denom.abs() > f32::EPSILON {
                let shift = ((y3 - y1) / denom).clamp(-1.0, 1.0);
                refined_lag += shift;
            }
        }

        let frequency = sample_rate / refined_lag;
        if frequency < self.min_pitch_hz || frequency > self.max_pitch_hz {
            return None;
        }
        Some(frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: f32 = 44100.0;
    const FRAME_SIZE: usize = 2048;

    fn generate_sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..FRAME_SIZE)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE;
                (2.0 * PI * freq * t).sin() * amplitude
            })
            .collect()
    }

    fn generate_noise(amplitude: f32) -> Vec<f32> {
        // Linear congruential generator, deterministic across runs
        let mut seed = 0x2545_f491u32;
        (0..FRAME_SIZE)
            .map(|_| {
                seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
                ((seed >> 16) as f32 / 32768.0 - 1.0) * amplitude
            })
            .collect()
    }

    fn estimator() -> PitchEstimator {
        PitchEstimator::new(&AnalysisConfig::default())
    }

    #[test]
    fn test_silence_returns_sentinel() {
        let mut est = estimator();
        assert_eq!(est.estimate(&vec![0.0; FRAME_SIZE], SAMPLE_RATE), None);
    }

    #[test]
    fn test_near_silence_returns_sentinel() {
        let mut est = estimator();
        let samples = generate_sine(220.0, 0.001);
        assert_eq!(est.estimate(&samples, SAMPLE_RATE), None);
    }

    #[test]
    fn test_sine_detection_across_range() {
        let mut est = estimator();
        for freq in [55.0f32, 110.0, 220.0, 330.0, 440.0, 523.25] {
            let samples = generate_sine(freq, 0.5);
            let detected = est
                .estimate(&samples, SAMPLE_RATE)
                .unwrap_or_else(|| panic!("no pitch detected at {freq} Hz"));
            assert!(
                (detected - freq).abs() < 3.0,
                "expected ~{freq} Hz, got {detected} Hz"
            );
        }
    }

    #[test]
    fn test_noise_rejected_by_confidence() {
        let mut est = estimator();
        let samples = generate_noise(0.5);
        assert_eq!(est.estimate(&samples, SAMPLE_RATE), None);
    }

    #[test]
    fn test_short_buffer_returns_sentinel() {
        let mut est = estimator();
        assert_eq!(est.estimate(&[0.5], SAMPLE_RATE), None);
        assert_eq!(est.estimate(&[], SAMPLE_RATE), None);
    }

    #[test]
    fn test_repeated_calls_reuse_scratch() {
        let mut est = estimator();
        let samples = generate_sine(440.0, 0.5);
        let first = est.estimate(&samples, SAMPLE_RATE).unwrap();
        let second = est.estimate(&samples, SAMPLE_RATE).unwrap();
        assert_eq!(first, second);
    }
}
