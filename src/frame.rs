//! Capture frame types
//!
//! A `SampleFrame` is the per-tick handoff from the capture collaborator:
//! a borrowed time-domain buffer plus the matching frequency-domain magnitude
//! buffer. Frames are ephemeral - anything the pipeline keeps past the
//! current tick is copied into owned storage.

use crate::error::AnalysisError;

/// One tick's worth of captured audio, borrowed from the capture layer.
#[derive(Debug, Clone, Copy)]
pub struct SampleFrame<'a> {
    /// Time-domain samples in [-1, 1]
    pub samples: &'a [f32],
    /// Frequency-domain magnitudes in dB, one per bin (fft_size / 2 bins)
    pub spectrum_db: &'a [f32],
    /// Capture sample rate in Hz
    pub sample_rate: f32,
    /// FFT size the spectrum was computed with
    pub fft_size: usize,
}

impl SampleFrame<'_> {
    /// Frequency width of one spectrum bin in Hz.
    pub fn bin_hz(&self) -> f32 {
        self.sample_rate / self.fft_size as f32
    }

    /// Check the frame's contract: positive sample rate and a spectrum whose
    /// length matches the declared FFT size.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidSampleRate(self.sample_rate));
        }
        let expected = self.fft_size / 2;
        if self.fft_size == 0 || self.spectrum_db.len() != expected {
            return Err(AnalysisError::SpectrumLengthMismatch {
                expected,
                got: self.spectrum_db.len(),
            });
        }
        Ok(())
    }
}

/// Root-mean-square level of a sample buffer.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0; 512]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_full_scale_square() {
        let samples: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&samples) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_rejects_zero_sample_rate() {
        let samples = [0.0f32; 16];
        let spectrum = [0.0f32; 8];
        let frame = SampleFrame {
            samples: &samples,
            spectrum_db: &spectrum,
            sample_rate: 0.0,
            fft_size: 16,
        };
        assert!(matches!(
            frame.validate(),
            Err(AnalysisError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_frame_rejects_mismatched_spectrum() {
        let samples = [0.0f32; 16];
        let spectrum = [0.0f32; 5];
        let frame = SampleFrame {
            samples: &samples,
            spectrum_db: &spectrum,
            sample_rate: 44100.0,
            fft_size: 16,
        };
        assert!(matches!(
            frame.validate(),
            Err(AnalysisError::SpectrumLengthMismatch { expected: 8, got: 5 })
        ));
    }

    #[test]
    fn test_bin_hz() {
        let samples = [0.0f32; 2048];
        let spectrum = [0.0f32; 1024];
        let frame = SampleFrame {
            samples: &samples,
            spectrum_db: &spectrum,
            sample_rate: 44100.0,
            fft_size: 2048,
        };
        assert!(frame.validate().is_ok());
        assert!((frame.bin_hz() - 21.533203).abs() < 0.001);
    }
}
