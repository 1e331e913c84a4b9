//! The streaming stage abstraction shared by every filter in a pipeline.
//!
//! A [`StreamStage`] consumes exactly one sample per call and either produces
//! an output sample or reports that it has not yet seen enough history
//! ([`Output::Pending`]). Stages are composed into a [`StageChain`], which is
//! itself a stage.
//!
//! # Example
//! ```
//! use qrstream::{MovingDifference, MovingWindowAverage, Output, StageChain, StreamStage};
//!
//! let mut chain = StageChain::new()
//!     .with(MovingDifference::new(1).unwrap())
//!     .with(MovingWindowAverage::new(2).unwrap());
//!
//! assert_eq!(chain.warm_up(), 1);
//! assert_eq!(chain.advance(1.0), Output::Pending);
//! assert_eq!(chain.advance(3.0), Output::Value(2.0));
//! assert_eq!(chain.advance(4.0), Output::Value(1.5));
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;

/// Result of advancing a stage by one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Output {
    /// A defined output sample.
    Value(f64),
    /// Not enough (finite) history yet to define an output.
    Pending,
}

impl Output {
    /// `Value(x)` when `x` is finite, `Pending` otherwise.
    ///
    /// Stages build their results through this so a non-finite value is never
    /// handed downstream.
    #[inline]
    pub fn finite(x: f64) -> Self {
        if x.is_finite() {
            Output::Value(x)
        } else {
            Output::Pending
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Output::Value(x) => Some(x),
            Output::Pending => None,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Output::Pending)
    }
}

/// One causal, stateful, sample-at-a-time processing step.
///
/// # Contract
/// - `advance` updates internal state exactly once per call, including calls
///   that return [`Output::Pending`].
/// - `reset` returns the stage to its freshly constructed state without
///   changing its parameters.
/// - `warm_up` is the number of leading finite samples for which `advance`
///   returns `Pending`. It is fixed at construction.
pub trait StreamStage {
    fn advance(&mut self, sample: f64) -> Output;

    fn reset(&mut self);

    fn warm_up(&self) -> usize {
        0
    }
}

/// An ordered, fixed sequence of stages applied one after another.
///
/// A `Pending` from any stage short-circuits the chain: later stages are not
/// advanced for that sample, so each stage only ever sees defined input.
#[derive(Default)]
pub struct StageChain {
    stages: Vec<Box<dyn StreamStage + Send>>,
}

impl StageChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends `stage` to the end of the chain.
    pub fn with<S: StreamStage + Send + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl StreamStage for StageChain {
    fn advance(&mut self, sample: f64) -> Output {
        let mut x = sample;
        for stage in self.stages.iter_mut() {
            match stage.advance(x) {
                Output::Value(y) => x = y,
                Output::Pending => return Output::Pending,
            }
        }
        Output::finite(x)
    }

    fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
    }

    /// Sum of the stages' warm-up lengths.
    fn warm_up(&self) -> usize {
        self.stages.iter().map(|s| s.warm_up()).sum()
    }
}
