//! Session lifecycle and accumulation
//!
//! One `SessionAnalyzer` owns all mutable state for a recording session and
//! is driven synchronously from the embedding application's tick callback
//! (~60 Hz). No operation here blocks; the expensive pitch/cycle stage can
//! be decimated to every Nth tick via an explicit, injectable policy while
//! cheap per-tick features (RMS, live band levels) always run.
//!
//! State machine: Idle -> Armed -> Sampling -> Finalizing -> Complete, with
//! Aborted reachable from Armed/Sampling. Only Sampling accumulates, every
//! start resets all accumulators, and finalization runs exactly once,
//! synchronously, producing a profile from whatever was accumulated.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chakra::{self, ScoreInputs};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::frame::{self, SampleFrame};
use crate::glottal::{self, GlottalCycle};
use crate::notes;
use crate::perturbation;
use crate::pitch::PitchEstimator;
use crate::profile::{self, FrequencyProfile, VoiceProfile};
use crate::spectral::{self, Overtone};

/// Number of overtone slots (harmonics 2..=8).
const OVERTONE_SLOTS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Armed,
    Sampling,
    Finalizing,
    Complete,
    Aborted,
}

/// Decides on which ticks the expensive pitch/cycle stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimationPolicy {
    interval: u32,
}

impl DecimationPolicy {
    /// Run the expensive stage every `interval` ticks (clamped to at least 1).
    pub fn every(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    pub fn every_tick() -> Self {
        Self::every(1)
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Whether the expensive stage runs on the given zero-based tick.
    pub fn should_run_expensive(&self, tick: u64) -> bool {
        tick % self.interval as u64 == 0
    }
}

/// Per-tick view of the running session for live display.
///
/// Carries both the instantaneous reading (possibly absent) and the
/// last-known-good reading; any hold/smoothing on dropout is a presentation
/// decision, not handled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub state: SessionState,
    /// Ticks processed so far this session
    pub tick: u64,
    /// Pitch estimated on this tick, if the expensive stage ran and passed
    /// all gates
    pub pitch_hz: Option<f32>,
    /// Most recent accepted pitch this session
    pub last_valid_pitch_hz: Option<f32>,
    pub rms: f32,
    /// Spectral-band-energy levels for the seven bands, each in [0, 1]
    pub band_levels: [f32; 7],
    /// Accepted / analyzed frames so far
    pub voiced_ratio: f32,
}

/// Owns all per-session accumulation state and drives the analysis pipeline.
pub struct SessionAnalyzer {
    config: AnalysisConfig,
    policy: DecimationPolicy,
    state: SessionState,
    estimator: PitchEstimator,

    tick: u64,
    /// Capture format locked in by the first frame of a session
    format: Option<(f32, usize)>,

    pitch_readings: Vec<Option<f32>>,
    recent_valid: VecDeque<f32>,
    last_valid_pitch: Option<f32>,
    cycles: Vec<GlottalCycle>,

    overtone_amp_sums: [f32; OVERTONE_SLOTS],
    overtone_db_sums: [f32; OVERTONE_SLOTS],
    overtone_frames: u32,

    hnr_sum: f32,
    centroid_sum: f32,
    slope_sum: f32,
    spectral_frames: u32,
    /// Owned running sum of voiced-frame spectra (frames are ephemeral)
    spectrum_sum: Vec<f32>,

    rms_history: Vec<f32>,
    voiced_rms_min: f32,
    voiced_rms_max: f32,
    voiced_frames: u32,
    analyzed_frames: u32,
}

impl SessionAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let policy = DecimationPolicy::every(config.expensive_stage_interval);
        Self::with_policy(config, policy)
    }

    pub fn with_policy(
        config: AnalysisConfig,
        policy: DecimationPolicy,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        chakra::validate_weights()?;
        let estimator = PitchEstimator::new(&config);
        Ok(Self {
            config,
            policy,
            state: SessionState::Idle,
            estimator,
            tick: 0,
            format: None,
            pitch_readings: Vec::new(),
            recent_valid: VecDeque::new(),
            last_valid_pitch: None,
            cycles: Vec::new(),
            overtone_amp_sums: [0.0; OVERTONE_SLOTS],
            overtone_db_sums: [0.0; OVERTONE_SLOTS],
            overtone_frames: 0,
            hnr_sum: 0.0,
            centroid_sum: 0.0,
            slope_sum: 0.0,
            spectral_frames: 0,
            spectrum_sum: Vec::new(),
            rms_history: Vec::new(),
            voiced_rms_min: f32::INFINITY,
            voiced_rms_max: 0.0,
            voiced_frames: 0,
            analyzed_frames: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn policy(&self) -> DecimationPolicy {
        self.policy
    }

    /// Arm a new session; valid from Idle, Complete or Aborted.
    pub fn arm(&mut self) -> Result<(), AnalysisError> {
        match self.state {
            SessionState::Idle | SessionState::Complete | SessionState::Aborted => {
                self.state = SessionState::Armed;
                Ok(())
            }
            _ => Err(AnalysisError::InvalidTransition(format!(
                "cannot arm from {:?}",
                self.state
            ))),
        }
    }

    /// Begin sampling. Resets every accumulator; no state survives across
    /// sessions.
    pub fn start(&mut self) -> Result<(), AnalysisError> {
        match self.state {
            SessionState::Idle
            | SessionState::Armed
            | SessionState::Complete
            | SessionState::Aborted => {
                self.reset_accumulators();
                self.state = SessionState::Sampling;
                debug!(interval = self.policy.interval(), "session sampling started");
                Ok(())
            }
            _ => Err(AnalysisError::InvalidTransition(format!(
                "cannot start from {:?}",
                self.state
            ))),
        }
    }

    /// Abort the session without producing a profile.
    pub fn abort(&mut self) -> Result<(), AnalysisError> {
        match self.state {
            SessionState::Armed | SessionState::Sampling => {
                self.state = SessionState::Aborted;
                debug!(ticks = self.tick, "session aborted");
                Ok(())
            }
            _ => Err(AnalysisError::InvalidTransition(format!(
                "cannot abort from {:?}",
                self.state
            ))),
        }
    }

    fn reset_accumulators(&mut self) {
        self.tick = 0;
        self.format = None;
        self.pitch_readings.clear();
        self.recent_valid.clear();
        self.last_valid_pitch = None;
        self.cycles.clear();
        self.overtone_amp_sums = [0.0; OVERTONE_SLOTS];
        self.overtone_db_sums = [0.0; OVERTONE_SLOTS];
        self.overtone_frames = 0;
        self.hnr_sum = 0.0;
        self.centroid_sum = 0.0;
        self.slope_sum = 0.0;
        self.spectral_frames = 0;
        self.spectrum_sum.clear();
        self.rms_history.clear();
        self.voiced_rms_min = f32::INFINITY;
        self.voiced_rms_max = 0.0;
        self.voiced_frames = 0;
        self.analyzed_frames = 0;
    }

    /// Process one capture frame. Only valid while Sampling.
    pub fn process_frame(&mut self, frame: &SampleFrame<'_>) -> Result<LiveSnapshot, AnalysisError> {
        if self.state != SessionState::Sampling {
            return Err(AnalysisError::InvalidTransition(format!(
                "cannot process frames in {:?}",
                self.state
            )));
        }
        frame.validate()?;

        match self.format {
            None => {
                self.format = Some((frame.sample_rate, frame.fft_size));
                self.spectrum_sum = vec![0.0; frame.spectrum_db.len()];
            }
            Some((sample_rate, fft_size)) => {
                if frame.sample_rate != sample_rate {
                    return Err(AnalysisError::InvalidSampleRate(frame.sample_rate));
                }
                if frame.fft_size != fft_size {
                    return Err(AnalysisError::SpectrumLengthMismatch {
                        expected: fft_size / 2,
                        got: frame.spectrum_db.len(),
                    });
                }
            }
        }

        let rms = frame::rms(frame.samples);
        self.rms_history.push(rms);

        let bin_hz = frame.bin_hz();
        let band_levels = chakra::live_band_levels(frame.spectrum_db, bin_hz);

        let mut instantaneous = None;
        if self.policy.should_run_expensive(self.tick) {
            self.analyzed_frames += 1;
            let accepted = self.gated_pitch(frame);
            if let Some(f0) = accepted {
                self.accumulate_voiced(frame, f0, rms, bin_hz);
            }
            self.pitch_readings.push(accepted);
            instantaneous = accepted;
        }

        self.tick += 1;
        Ok(LiveSnapshot {
            state: self.state,
            tick: self.tick,
            pitch_hz: instantaneous,
            last_valid_pitch_hz: self.last_valid_pitch,
            rms,
            band_levels,
            voiced_ratio: self.voiced_ratio(),
        })
    }

    /// Run the estimator and the session-level gates: spectral-flatness
    /// noise suppression and octave-error rejection against the rolling
    /// median of recent valid readings.
    fn gated_pitch(&mut self, frame: &SampleFrame<'_>) -> Option<f32> {
        let raw = self.estimator.estimate(frame.samples, frame.sample_rate)?;

        let flatness = spectral::spectral_flatness(frame.spectrum_db);
        if flatness > self.config.flatness_noise_threshold {
            debug!(flatness, "pitch reading suppressed as noise");
            return None;
        }

        if let Some(median) = self.rolling_median() {
            let ratio = raw / median;
            if self.is_octave_error(ratio) {
                debug!(raw, median, ratio, "octave error discarded");
                return None;
            }
        }
        Some(raw)
    }

    fn is_octave_error(&self, ratio: f32) -> bool {
        let (h_lo, h_hi) = self.config.octave_halving_band;
        let (d_lo, d_hi) = self.config.octave_doubling_band;
        (ratio >= h_lo && ratio <= h_hi) || (ratio >= d_lo && ratio <= d_hi)
    }

    fn rolling_median(&self) -> Option<f32> {
        if self.recent_valid.is_empty() {
            return None;
        }
        let mut sorted: Vec<f32> = self.recent_valid.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);
        Some(sorted[sorted.len() / 2])
    }

    fn accumulate_voiced(&mut self, frame: &SampleFrame<'_>, f0: f32, rms: f32, bin_hz: f32) {
        self.voiced_frames += 1;
        self.last_valid_pitch = Some(f0);
        self.recent_valid.push_back(f0);
        while self.recent_valid.len() > self.config.median_window {
            self.recent_valid.pop_front();
        }

        self.cycles.extend(glottal::extract_cycles(
            frame.samples,
            frame.sample_rate,
            f0,
            self.config.cycle_tolerance,
        ));

        let overtones = spectral::overtones(frame.spectrum_db, bin_hz, f0);
        for (i, overtone) in overtones.iter().enumerate() {
            self.overtone_amp_sums[i] += overtone.amplitude;
            self.overtone_db_sums[i] += overtone.relative_db;
        }
        self.overtone_frames += 1;

        self.hnr_sum += spectral::hnr_db(frame.spectrum_db, bin_hz, f0, self.config.hnr_ceiling_db);
        self.centroid_sum += spectral::spectral_centroid_hz(frame.spectrum_db, bin_hz);
        self.slope_sum += spectral::spectral_slope(frame.spectrum_db, bin_hz);
        self.spectral_frames += 1;
        for (sum, &db) in self.spectrum_sum.iter_mut().zip(frame.spectrum_db) {
            *sum += db;
        }

        if rms > 0.0 {
            self.voiced_rms_min = self.voiced_rms_min.min(rms);
            self.voiced_rms_max = self.voiced_rms_max.max(rms);
        }
    }

    fn voiced_ratio(&self) -> f32 {
        if self.analyzed_frames == 0 {
            0.0
        } else {
            self.voiced_frames as f32 / self.analyzed_frames as f32
        }
    }

    /// Finalize the session and build the immutable profile. Runs once,
    /// synchronously; a session that never detected voice still completes.
    pub fn finalize(&mut self) -> Result<FrequencyProfile, AnalysisError> {
        if self.state != SessionState::Sampling {
            return Err(AnalysisError::InvalidTransition(format!(
                "cannot finalize from {:?}",
                self.state
            )));
        }
        self.state = SessionState::Finalizing;

        let readings: Vec<f32> = self
            .pitch_readings
            .iter()
            .map(|r| r.unwrap_or(0.0))
            .collect();
        let stats = profile::fundamental_stats(&readings);
        let fundamental = stats.mean_hz;
        let stability = profile::stability(&readings);

        let overtones = self.session_overtones(fundamental);
        let mean_overtone_amplitude = if overtones.is_empty() {
            0.0
        } else {
            overtones.iter().map(|o| o.amplitude).sum::<f32>() / overtones.len() as f32
        };
        let richness = (mean_overtone_amplitude * 100.0).round() as u32;

        let periods: Vec<f32> = self.cycles.iter().map(|c| c.period_seconds).collect();
        let amplitudes: Vec<f32> = self.cycles.iter().map(|c| c.peak_amplitude).collect();
        let jitter = perturbation::analyze_jitter(&periods);
        let shimmer = perturbation::analyze_shimmer(&amplitudes);

        // Uniform aggregation policy: arithmetic mean across voiced frames,
        // matching the overtone and perturbation treatment
        let (hnr_db, centroid, slope) = if self.spectral_frames > 0 {
            let n = self.spectral_frames as f32;
            (self.hnr_sum / n, self.centroid_sum / n, self.slope_sum / n)
        } else {
            (0.0, 0.0, 0.0)
        };

        let formants = match self.format {
            Some((sample_rate, fft_size)) if self.spectral_frames > 0 && fundamental > 0.0 => {
                let n = self.spectral_frames as f32;
                let mean_spectrum: Vec<f32> =
                    self.spectrum_sum.iter().map(|sum| sum / n).collect();
                let bin_hz = sample_rate / fft_size as f32;
                spectral::estimate_formants(&mean_spectrum, bin_hz, fundamental)
            }
            _ => Default::default(),
        };

        let rms_energy = if self.rms_history.is_empty() {
            0.0
        } else {
            self.rms_history.iter().sum::<f32>() / self.rms_history.len() as f32
        };
        let dynamic_range_db = if self.voiced_rms_max > 0.0
            && self.voiced_rms_min.is_finite()
            && self.voiced_rms_min > 0.0
        {
            20.0 * (self.voiced_rms_max / self.voiced_rms_min).log10()
        } else {
            0.0
        };

        let voiced_ratio = self.voiced_ratio();
        let low_confidence = voiced_ratio < self.config.voice_validity_cutoff;
        if low_confidence {
            warn!(
                voiced_ratio,
                cutoff = self.config.voice_validity_cutoff,
                "session has low voice validity; profile marked low-confidence"
            );
        }

        let voice = VoiceProfile {
            fundamental: stats,
            jitter,
            shimmer,
            hnr_db,
            formants,
            spectral_centroid_hz: centroid,
            spectral_slope_db_per_hz: slope,
            rms_energy,
            dynamic_range_db,
            pitch_range: profile::pitch_range(&readings),
            cycle_count: self.cycles.len(),
            voiced_ratio,
            low_confidence,
        };

        let inputs = ScoreInputs {
            fundamental_hz: fundamental,
            stability,
            mean_overtone_amplitude,
            jitter_relative_percent: jitter.relative_percent,
            shimmer_db: shimmer.db,
            hnr_db,
            spectral_centroid_hz: centroid,
            spectral_slope_db_per_hz: slope,
            formant_confidence: formants.confidence,
        };
        let chakra_scores = chakra::score_bands(&inputs, &self.config);
        let dominant_band = chakra::dominant_band(&chakra_scores);

        let profile = FrequencyProfile {
            id: Uuid::new_v4(),
            fundamental_hz: fundamental,
            note: notes::note_for_frequency(fundamental),
            dominant_band,
            stability,
            overtones,
            richness,
            voice,
            chakra_scores,
            companion_tones: notes::companion_tones(fundamental),
            created_at: Utc::now(),
        };

        info!(
            fundamental_hz = fundamental,
            stability,
            voiced_ratio,
            cycles = profile.voice.cycle_count,
            "session finalized"
        );
        self.state = SessionState::Complete;
        Ok(profile)
    }

    /// Average the per-frame overtone snapshots index-wise. Always seven
    /// entries; all-zero when no voiced frame was seen.
    fn session_overtones(&self, fundamental: f32) -> Vec<Overtone> {
        (0..OVERTONE_SLOTS)
            .map(|i| {
                let harmonic = i as u32 + 2;
                if self.overtone_frames > 0 {
                    let n = self.overtone_frames as f32;
                    Overtone {
                        harmonic,
                        frequency_hz: fundamental * harmonic as f32,
                        amplitude: self.overtone_amp_sums[i] / n,
                        relative_db: self.overtone_db_sums[i] / n,
                    }
                } else {
                    Overtone {
                        harmonic,
                        frequency_hz: 0.0,
                        amplitude: 0.0,
                        relative_db: -80.0,
                    }
                }
            })
            .collect()
    }
}
