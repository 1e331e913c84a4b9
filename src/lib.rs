#![no_std]
//! Streaming QRS detection for ECG signals.
//!
//! Samples go in one at a time; R-peak indices come out as soon as each
//! beat is confirmed. Two detectors are provided, [`PanTompkinsRealTime`]
//! and [`EngZeeRealTime`], both built from the same pieces:
//!
//! - [`StreamStage`] filters ([`MovingDifference`], [`MovingWindowAverage`],
//!   [`Convolution`], [`Square`], [`BandFilter`]) chained in a [`StageChain`]
//! - a [`PeakDetector`] with adaptive thresholds
//! - a [`Pipeline`] that tracks warm-up so indices refer to the input stream
//!
//! The [`offline`] module holds batch versions of both algorithms.
//!
//! ```
//! use qrstream::{EngZeeRealTime, RealTimeDetector};
//!
//! let mut detector = EngZeeRealTime::new(360.0).unwrap();
//! for sample in [0.0; 100] {
//!     if let Some(peak) = detector.process_sample(sample) {
//!         println!("beat at sample {peak}");
//!     }
//! }
//! ```

extern crate alloc;

mod detector;
mod error;
pub mod filter;
pub mod offline;
mod pipeline;
mod ring;
mod stage;

#[cfg(test)]
mod test_signals;

pub use detector::{
    EngZeeConfig, EngZeePeakDetector, EngZeeRealTime, PanTompkinsConfig, PanTompkinsPeakDetector,
    PanTompkinsRealTime, RealTimeDetector,
};
pub use error::ConfigError;
pub use filter::{
    center_and_width, BandFilter, BiquadCoeffs, CausalFilter, Convolution, IirFilter,
    MovingDifference, MovingWindowAverage, Square,
};
pub use pipeline::{PeakDetector, Pipeline, PipelineState};
pub use ring::RingBuffer;
pub use stage::{Output, StageChain, StreamStage};
