//! Stage chain + peak detector composition with warm-up accounting.
//!
//! A [`Pipeline`] feeds every raw sample through its [`StageChain`]. While the
//! chain is still priming (reporting [`Output::Pending`]) the sample is counted
//! as *skipped*. Once the chain yields its first defined value the pipeline is
//! [`PipelineState::Ready`] for good, the skipped count is frozen, and every
//! detector-local peak index is shifted by it so callers always see indices in
//! input-stream coordinates.
//!
//! An optional *settle* period discards a fixed number of defined outputs
//! after priming; those samples are counted as skipped too.

use crate::stage::{Output, StageChain, StreamStage};

/// Adaptive-threshold detector at the end of a pipeline.
///
/// Receives one filtered sample per call together with the raw input sample
/// at the same stream position, and returns the detector-local index (number
/// of samples it had consumed before the peak) of a peak confirmed on this
/// call.
pub trait PeakDetector {
    fn detect(&mut self, filtered: f64, raw: f64) -> Option<usize>;

    fn reset(&mut self);
}

/// Lifecycle of a pipeline. Transitions only from `Priming` to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Priming,
    Ready,
}

/// Ordered stage chain followed by a peak detector.
pub struct Pipeline<D> {
    chain: StageChain,
    detector: D,
    settle: usize,
    warm_up: usize,
    state: PipelineState,
    settle_left: usize,
    skipped: usize,
    consumed: usize,
    held_filtered: f64,
    held_raw: f64,
}

impl<D: PeakDetector> Pipeline<D> {
    /// Builds a pipeline; `settle` extra defined outputs are discarded after
    /// the chain primes.
    pub fn new(chain: StageChain, detector: D, settle: usize) -> Self {
        let warm_up = chain.warm_up() + settle;
        Self {
            chain,
            detector,
            settle,
            warm_up,
            state: PipelineState::Priming,
            settle_left: settle,
            skipped: 0,
            consumed: 0,
            held_filtered: 0.0,
            held_raw: 0.0,
        }
    }

    /// Consumes one raw sample and returns a peak index in stream coordinates.
    pub fn process(&mut self, sample: f64) -> Option<usize> {
        self.consumed += 1;
        let output = self.chain.advance(sample);

        if self.state == PipelineState::Priming {
            match output {
                Output::Pending => {
                    self.skipped += 1;
                    return None;
                }
                Output::Value(_) if self.settle_left > 0 => {
                    self.settle_left -= 1;
                    self.skipped += 1;
                    return None;
                }
                Output::Value(_) => {
                    self.state = PipelineState::Ready;
                    log::debug!("pipeline ready after {} skipped samples", self.skipped);
                }
            }
        }

        // Keep the detector clock aligned with the stream across gaps
        let filtered = match output {
            Output::Value(x) => {
                self.held_filtered = x;
                x
            }
            Output::Pending => {
                log::warn!(
                    "no filtered output at sample {}, holding {}",
                    self.consumed - 1,
                    self.held_filtered
                );
                self.held_filtered
            }
        };
        if sample.is_finite() {
            self.held_raw = sample;
        }

        self.detector
            .detect(filtered, self.held_raw)
            .map(|local| local + self.skipped)
    }

    /// Returns the whole pipeline to its freshly constructed state.
    pub fn reset(&mut self) {
        self.chain.reset();
        self.detector.reset();
        self.state = PipelineState::Priming;
        self.settle_left = self.settle;
        self.skipped = 0;
        self.consumed = 0;
        self.held_filtered = 0.0;
        self.held_raw = 0.0;
    }

    /// Samples needed before the detector sees its first input, given finite input.
    pub fn warm_up(&self) -> usize {
        self.warm_up
    }

    /// Leading samples that produced no detector input.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }
}
