//! Frequency-domain magnitude computation
//!
//! Capture collaborators are expected to hand the pipeline both a time-domain
//! buffer and a matching dB magnitude spectrum. For sources that only deliver
//! raw samples, `SpectrumAnalyzer` produces that spectrum: Hann window,
//! forward FFT, magnitude in dB per bin. The FFT plan and scratch buffers are
//! created once and reused.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Floor used before taking the log, ~-200 dB.
const MAGNITUDE_EPSILON: f32 = 1e-10;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for the given FFT size (must be non-zero).
    pub fn new(fft_size: usize) -> Self {
        assert!(fft_size > 0, "FFT size must be greater than 0");
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let window = (0..fft_size)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / fft_size as f32).cos())
            .collect();
        Self {
            fft,
            fft_size,
            window,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins produced per frame.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute dB magnitudes for one frame into `out`.
    ///
    /// Input shorter than the FFT size is zero-padded, longer input is
    /// truncated. `out` is cleared and refilled with `bin_count()` values.
    pub fn magnitudes_db(&mut self, samples: &[f32], out: &mut Vec<f32>) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 2.0 / self.fft_size as f32;
        out.clear();
        out.extend(self.buffer[..self.bin_count()].iter().map(|c| {
            let magnitude = (c.norm() * scale).max(MAGNITUDE_EPSILON);
            20.0 * magnitude.log10()
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44100.0;
    const FFT_SIZE: usize = 2048;

    fn generate_sine(freq: f32, amplitude: f32) -> Vec<f32> {
        (0..FFT_SIZE)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE;
                (2.0 * PI * freq * t).sin() * amplitude
            })
            .collect()
    }

    #[test]
    fn test_sine_peak_lands_in_expected_bin() {
        let mut analyzer = SpectrumAnalyzer::new(FFT_SIZE);
        let mut spectrum = Vec::new();
        analyzer.magnitudes_db(&generate_sine(440.0, 0.5), &mut spectrum);
        assert_eq!(spectrum.len(), FFT_SIZE / 2);

        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let expected_bin = (440.0 / (SAMPLE_RATE / FFT_SIZE as f32)).round() as usize;
        assert!(
            (peak_bin as i64 - expected_bin as i64).abs() <= 1,
            "peak at bin {peak_bin}, expected ~{expected_bin}"
        );
    }

    #[test]
    fn test_peak_level_well_above_floor() {
        let mut analyzer = SpectrumAnalyzer::new(FFT_SIZE);
        let mut spectrum = Vec::new();
        analyzer.magnitudes_db(&generate_sine(440.0, 0.5), &mut spectrum);

        let peak = spectrum.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let far_bin = spectrum.len() - 10;
        assert!(peak > spectrum[far_bin] + 60.0);
    }

    #[test]
    fn test_silence_is_floor_everywhere() {
        let mut analyzer = SpectrumAnalyzer::new(FFT_SIZE);
        let mut spectrum = Vec::new();
        analyzer.magnitudes_db(&vec![0.0; FFT_SIZE], &mut spectrum);
        assert!(spectrum.iter().all(|&db| db <= -180.0));
    }

    #[test]
    fn test_short_input_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(FFT_SIZE);
        let mut spectrum = Vec::new();
        analyzer.magnitudes_db(&generate_sine(440.0, 0.5)[..512], &mut spectrum);
        assert_eq!(spectrum.len(), FFT_SIZE / 2);
    }
}
