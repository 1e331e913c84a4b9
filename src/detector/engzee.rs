//! Engelse–Zeelenberg QRS detection, one sample at a time.
//!
//! W. A. H. Engelse and C. Zeelenberg, "A single scan algorithm for
//! QRS-detection and feature extraction", Computers in Cardiology 6, 1979,
//! with the modifications of A. Lourenço et al., "Real Time
//! Electrocardiogram Segmentation for Finger Based ECG Biometrics", 2012.

use super::{samples, RealTimeDetector};
use crate::error::{check_duration, check_sample_rate, ConfigError};
use crate::filter::{center_and_width, BandFilter, CausalFilter, Convolution, MovingDifference};
use crate::pipeline::{PeakDetector, Pipeline, PipelineState};
use crate::ring::RingBuffer;
use crate::stage::StageChain;
use alloc::vec::Vec;

/// Smoothing kernel applied after the moving difference.
const KERNEL: [f64; 5] = [1.0, 4.0, 6.0, 4.0, 1.0];

/// Envelope estimates averaged into the threshold.
const ENVELOPE_HISTORY: usize = 5;

/// Parameters of the Engelse–Zeelenberg pipeline and peak detector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngZeeConfig {
    /// Sampling frequency in Hz.
    pub sample_rate: f64,
    /// Time the smoothed derivative must stay below the negative envelope
    /// to confirm a beat, in seconds.
    pub threshold_secs: f64,
    /// Band-stop edges in Hz.
    pub notch: (f64, f64),
    pub filter_order: usize,
    /// Defined outputs discarded after the chain primes, in seconds.
    pub settle_secs: f64,
}

impl EngZeeConfig {
    /// Standard parameters for the given sampling frequency (50 Hz mains).
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            threshold_secs: 0.0085,
            notch: (48.0, 52.0),
            filter_order: 4,
            settle_secs: 0.2,
        }
    }

    /// Same as [`new`](Self::new) with a custom confirmation threshold.
    pub fn with_threshold(sample_rate: f64, threshold_secs: f64) -> Self {
        Self {
            threshold_secs,
            ..Self::new(sample_rate)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_sample_rate(self.sample_rate)?;
        if self.filter_order == 0 {
            return Err(ConfigError::ZeroOrder);
        }
        let (low, high) = self.notch;
        center_and_width(self.sample_rate, low, high)?;
        if !(self.threshold_secs.is_finite() && self.threshold_secs >= 0.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold_secs));
        }
        check_duration("settle period", self.settle_secs)
    }

    pub fn settle(&self) -> usize {
        samples(self.settle_secs, self.sample_rate)
    }
}

/// Where the current beat candidate is in its edge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Idle,
    Rising { at: usize },
    Falling { at: usize, below: usize },
}

/// Adaptive-envelope peak detector over the smoothed derivative.
///
/// A sample above the envelope `M` (and more than 200 ms after the previous
/// candidate) starts a beat. Within 160 ms the signal must cross below `-M`
/// and stay there for more than the threshold count; the beat is then
/// located at the maximum of the raw signal from the threshold count before
/// the rising edge up to the current sample.
///
/// For the first five seconds `M` is 0.6 times the running maximum. After
/// that it follows the last candidate: re-estimated over 200 ms, then decayed
/// linearly from the mean of the recent estimates down to 0.6 of it at
/// 1200 ms, flat afterwards.
#[derive(Debug, Clone)]
pub struct EngZeePeakDetector {
    ms160: usize,
    ms200: usize,
    ms1200: usize,
    neg_threshold: usize,
    initial: usize,
    slope: Vec<f64>,
    raw_capacity: usize,
    state: State,
}

#[derive(Debug, Clone)]
struct State {
    n: usize,
    envelope: f64,
    next_envelope: f64,
    history: RingBuffer<f64>,
    last_candidate: Option<usize>,
    edge: Edge,
    previous: Option<f64>,
    running_max: f64,
    candidate_max: f64,
    raw: RingBuffer<(usize, f64)>,
}

impl State {
    fn new(raw_capacity: usize) -> Self {
        Self {
            n: 0,
            envelope: 0.0,
            next_envelope: 0.0,
            history: RingBuffer::new(ENVELOPE_HISTORY),
            last_candidate: None,
            edge: Edge::Idle,
            previous: None,
            running_max: f64::NEG_INFINITY,
            candidate_max: f64::NEG_INFINITY,
            raw: RingBuffer::new(raw_capacity),
        }
    }

    fn mean_history(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f64>() / self.history.len() as f64)
    }

    /// First index of the raw maximum in `[from, to)`.
    fn locate(&self, from: usize, to: usize) -> Option<usize> {
        self.raw
            .iter()
            .filter(|&(j, _)| j >= from && j < to)
            .fold(None, |best: Option<(usize, f64)>, entry| match best {
                Some((_, v)) if v >= entry.1 => best,
                _ => Some(entry),
            })
            .map(|(j, _)| j)
    }
}

impl EngZeePeakDetector {
    pub fn new(config: &EngZeeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fs = config.sample_rate;
        let ms160 = samples(0.16, fs);
        let ms200 = samples(0.2, fs);
        let ms1200 = samples(1.2, fs);
        let neg_threshold = samples(config.threshold_secs, fs);

        let n = ms1200.saturating_sub(ms200);
        let step = 0.4 / n as f64;
        let slope = (0..n).map(|k| 0.6 + (n - 1 - k) as f64 * step).collect();

        // Raw samples that can still fall inside a localization span
        let raw_capacity = ms160 + neg_threshold + 2;

        Ok(Self {
            ms160,
            ms200,
            ms1200,
            neg_threshold,
            initial: libm::ceil(5.0 * fs) as usize,
            slope,
            raw_capacity,
            state: State::new(raw_capacity),
        })
    }

    /// Current envelope `M`.
    pub fn envelope(&self) -> f64 {
        self.state.envelope
    }

    /// Samples below `-M` needed (exceeded) to confirm a beat.
    pub fn threshold_samples(&self) -> usize {
        self.neg_threshold
    }

    fn update_envelope(&mut self, i: usize) {
        let state = &mut self.state;
        if i < self.initial {
            state.envelope = 0.6 * state.running_max;
            state.history.push(state.envelope);
            return;
        }
        let Some(candidate) = state.last_candidate else {
            return;
        };

        let since = i - candidate;
        if since < self.ms200 {
            state.next_envelope = 0.6 * state.candidate_max;
            if let Some(last) = state.history.newest() {
                if state.next_envelope > 1.5 * last {
                    state.next_envelope = 1.1 * last;
                }
            }
        } else if since == self.ms200 {
            state.history.push(state.next_envelope);
            if let Some(mean) = state.mean_history() {
                state.envelope = mean;
            }
        } else if since < self.ms1200 {
            if let (Some(mean), Some(factor)) =
                (state.mean_history(), self.slope.get(since - self.ms200))
            {
                state.envelope = mean * factor;
            }
        } else if since > self.ms1200 {
            if let Some(mean) = state.mean_history() {
                state.envelope = 0.6 * mean;
            }
        }
    }

    fn update_edge(&mut self, i: usize, x: f64) {
        let state = &mut self.state;
        let floor = -state.envelope;
        let at = match state.edge {
            Edge::Idle => return,
            Edge::Rising { at } | Edge::Falling { at, .. } => at,
        };

        if i < at + self.ms160 {
            let crossed = x < floor && state.previous.is_some_and(|p| p > floor);
            state.edge = match state.edge {
                Edge::Rising { at } if crossed => Edge::Falling { at, below: 1 },
                Edge::Falling { at, below } if x < floor => Edge::Falling {
                    at,
                    below: below + 1,
                },
                Edge::Falling { .. } if x > floor => Edge::Idle,
                edge => edge,
            };
        } else if i > at + self.ms160 {
            log::debug!("no falling edge within window of candidate at {}", at);
            state.edge = Edge::Idle;
        }
    }
}

impl PeakDetector for EngZeePeakDetector {
    fn detect(&mut self, filtered: f64, raw: f64) -> Option<usize> {
        let i = self.state.n;
        self.state.n += 1;

        let state = &mut self.state;
        state.raw.push((i, raw));
        state.running_max = state.running_max.max(filtered);
        state.candidate_max = state.candidate_max.max(filtered);

        self.update_envelope(i);

        let state = &mut self.state;
        let clear = state.last_candidate.map_or(true, |q| i > q + self.ms200);
        if clear && filtered > state.envelope {
            state.last_candidate = Some(i);
            state.edge = Edge::Rising { at: i };
            state.candidate_max = filtered;
        }

        self.update_edge(i, filtered);

        let state = &mut self.state;
        let mut peak = None;
        if let Edge::Falling { at, below } = state.edge {
            if below > self.neg_threshold {
                peak = state.locate(at.saturating_sub(self.neg_threshold), i);
                state.edge = Edge::Idle;
                if let Some(p) = peak {
                    log::trace!("R peak at {} (candidate {})", p, at);
                }
            }
        }

        state.previous = Some(filtered);
        peak
    }

    fn reset(&mut self) {
        self.state = State::new(self.raw_capacity);
    }
}

/// Engelse–Zeelenberg detector over raw ECG samples.
///
/// # Example
/// ```
/// use qrstream::{EngZeeRealTime, RealTimeDetector};
///
/// let mut detector = EngZeeRealTime::new(250.0).unwrap();
/// assert_eq!(detector.warm_up(), 58);
/// assert!(detector.process_block(&[0.0; 58]).is_empty());
/// ```
pub struct EngZeeRealTime {
    config: EngZeeConfig,
    pipeline: Pipeline<EngZeePeakDetector>,
}

impl EngZeeRealTime {
    pub fn new(sample_rate: f64) -> Result<Self, ConfigError> {
        Self::with_config(EngZeeConfig::new(sample_rate))
    }

    /// Builds the detector with the built-in band-stop cascade.
    pub fn with_config(config: EngZeeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (low, high) = config.notch;
        let notch = BandFilter::band_stop(config.filter_order, config.sample_rate, low, high)?;
        Self::build(config, notch)
    }

    /// Builds the detector around a caller-supplied band-stop filter.
    pub fn with_filter<F>(config: EngZeeConfig, filter: F) -> Result<Self, ConfigError>
    where
        F: CausalFilter + Send + 'static,
    {
        config.validate()?;
        Self::build(config, BandFilter::new(filter))
    }

    fn build<F>(config: EngZeeConfig, notch: BandFilter<F>) -> Result<Self, ConfigError>
    where
        F: CausalFilter + Send + 'static,
    {
        let chain = StageChain::new()
            .with(notch)
            .with(MovingDifference::new(4)?)
            .with(Convolution::new(&KERNEL)?);
        let detector = EngZeePeakDetector::new(&config)?;

        Ok(Self {
            config,
            pipeline: Pipeline::new(chain, detector, config.settle()),
        })
    }

    pub fn config(&self) -> &EngZeeConfig {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Leading samples that never reached the peak detector, settle included.
    pub fn skipped(&self) -> usize {
        self.pipeline.skipped()
    }

    pub fn detector(&self) -> &EngZeePeakDetector {
        self.pipeline.detector()
    }
}

impl RealTimeDetector for EngZeeRealTime {
    fn process_sample(&mut self, sample: f64) -> Option<usize> {
        self.pipeline.process(sample)
    }

    fn reset(&mut self) {
        self.pipeline.reset();
    }

    fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    fn warm_up(&self) -> usize {
        self.pipeline.warm_up()
    }
}
