//! Jitter and shimmer analysis
//!
//! Jitter is cycle-to-cycle variation in period length, shimmer the same
//! variation in peak amplitude. Both need at least three accumulated cycles;
//! with fewer they return an explicit all-zero result rather than failing.

use serde::{Deserialize, Serialize};

/// Period perturbation measures. All zero when too little data was available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Jitter {
    /// Mean absolute cycle-to-cycle period difference in seconds
    pub absolute_seconds: f32,
    /// Absolute jitter as a percentage of the mean period
    pub relative_percent: f32,
    /// Relative average perturbation: 3-point smoothed, as a percentage
    pub rap_percent: f32,
}

/// Amplitude perturbation measures. All zero when too little data was available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Shimmer {
    /// Mean absolute cycle-to-cycle amplitude ratio in dB
    pub db: f32,
    /// Mean absolute amplitude difference as a percentage of the mean amplitude
    pub relative_percent: f32,
    /// 3-point amplitude perturbation quotient as a percentage
    pub apq3_percent: f32,
}

/// Jitter over ordered cycle periods in seconds.
pub fn analyze_jitter(periods: &[f32]) -> Jitter {
    if periods.len() < 3 {
        return Jitter::default();
    }

    let n = periods.len();
    let mean: f32 = periods.iter().sum::<f32>() / n as f32;
    if mean <= 0.0 {
        return Jitter::default();
    }

    let absolute = periods
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .sum::<f32>()
        / (n - 1) as f32;

    // 3-point centered moving average perturbation
    let rap_sum: f32 = (1..n - 1)
        .map(|i| {
            let local = (periods[i - 1] + periods[i] + periods[i + 1]) / 3.0;
            (periods[i] - local).abs()
        })
        .sum();
    let rap = rap_sum / (n - 2) as f32;

    Jitter {
        absolute_seconds: absolute,
        relative_percent: absolute / mean * 100.0,
        rap_percent: rap / mean * 100.0,
    }
}

/// Shimmer over ordered cycle peak amplitudes.
pub fn analyze_shimmer(amplitudes: &[f32]) -> Shimmer {
    if amplitudes.len() < 3 {
        return Shimmer::default();
    }

    let n = amplitudes.len();
    let mean: f32 = amplitudes.iter().sum::<f32>() / n as f32;
    if mean <= 0.0 {
        return Shimmer::default();
    }

    let mut db_sum = 0.0f32;
    let mut db_count = 0usize;
    for w in amplitudes.windows(2) {
        // Pairs with a non-positive member have no defined dB ratio
        if w[0] > 0.0 && w[1] > 0.0 {
            db_sum += (20.0 * (w[1] / w[0]).log10()).abs();
            db_count += 1;
        }
    }
    let db = if db_count > 0 { db_sum / db_count as f32 } else { 0.0 };

    let relative = amplitudes
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .sum::<f32>()
        / (n - 1) as f32;

    let apq3_sum: f32 = (1..n - 1)
        .map(|i| {
            let local = (amplitudes[i - 1] + amplitudes[i] + amplitudes[i + 1]) / 3.0;
            (amplitudes[i] - local).abs()
        })
        .sum();
    let apq3 = apq3_sum / (n - 2) as f32;

    Shimmer {
        db,
        relative_percent: relative / mean * 100.0,
        apq3_percent: apq3 / mean * 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfectly_periodic_sequence_has_zero_jitter() {
        let periods = vec![0.005f32; 40];
        let jitter = analyze_jitter(&periods);
        assert_eq!(jitter.absolute_seconds, 0.0);
        assert_eq!(jitter.relative_percent, 0.0);
        assert_eq!(jitter.rap_percent, 0.0);
    }

    #[test]
    fn test_constant_amplitudes_have_zero_shimmer() {
        let amps = vec![0.7f32; 40];
        let shimmer = analyze_shimmer(&amps);
        assert_eq!(shimmer.db, 0.0);
        assert_eq!(shimmer.relative_percent, 0.0);
        assert_eq!(shimmer.apq3_percent, 0.0);
    }

    #[test]
    fn test_too_few_samples_returns_all_zero() {
        assert_eq!(analyze_jitter(&[]), Jitter::default());
        assert_eq!(analyze_jitter(&[0.005, 0.005]), Jitter::default());
        assert_eq!(analyze_shimmer(&[0.5]), Shimmer::default());
        assert_eq!(analyze_shimmer(&[0.5, 0.5]), Shimmer::default());
    }

    #[test]
    fn test_alternating_periods_known_jitter() {
        // Periods alternating 0.010 / 0.011 s: every step differs by 0.001,
        // mean period 0.0105 -> relative jitter ~9.52%
        let periods: Vec<f32> = (0..20)
            .map(|i| if i % 2 == 0 { 0.010 } else { 0.011 })
            .collect();
        let jitter = analyze_jitter(&periods);
        assert!((jitter.absolute_seconds - 0.001).abs() < 1e-5);
        assert!(
            (jitter.relative_percent - 9.52).abs() < 0.2,
            "got {}",
            jitter.relative_percent
        );
        assert!(jitter.rap_percent > 0.0);
    }

    #[test]
    fn test_shimmer_db_known_ratio() {
        // Alternating 0.5 / 1.0: each step is |20*log10(2)| ~ 6.02 dB
        let amps: Vec<f32> = (0..20).map(|i| if i % 2 == 0 { 0.5 } else { 1.0 }).collect();
        let shimmer = analyze_shimmer(&amps);
        assert!((shimmer.db - 6.02).abs() < 0.05, "got {}", shimmer.db);
    }

    #[test]
    fn test_non_positive_amplitudes_guarded() {
        let amps = vec![0.0f32, 0.5, 0.0, 0.5, 0.0];
        let shimmer = analyze_shimmer(&amps);
        // No valid dB pairs, but relative/apq3 still defined
        assert_eq!(shimmer.db, 0.0);
        assert!(shimmer.relative_percent > 0.0);
    }
}
