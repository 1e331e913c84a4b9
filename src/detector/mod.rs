//! Real-time QRS detectors.
//!
//! Each detector is a [`Pipeline`](crate::Pipeline) of filter stages feeding
//! an adaptive-threshold peak detector:
//!
//! - [`PanTompkinsRealTime`]: band-pass, first difference, squaring and
//!   moving-window integration, then dual thresholds with missed-beat
//!   recovery.
//! - [`EngZeeRealTime`]: mains notch, moving difference and a 5-tap
//!   smoothing kernel, then an adaptive envelope with rising/falling edge
//!   confirmation.
//!
//! Both report peak indices in input-stream coordinates.

mod engzee;
mod pan_tompkins;

pub use engzee::{EngZeeConfig, EngZeePeakDetector, EngZeeRealTime};
pub use pan_tompkins::{PanTompkinsConfig, PanTompkinsPeakDetector, PanTompkinsRealTime};

use alloc::vec::Vec;

/// Sample-at-a-time QRS detector.
pub trait RealTimeDetector {
    /// Consumes one sample and returns the index of a peak confirmed on this
    /// call, if any.
    fn process_sample(&mut self, sample: f64) -> Option<usize>;

    /// Discards all state so the next sample is treated as index 0.
    fn reset(&mut self);

    fn sample_rate(&self) -> f64;

    /// Samples consumed before the peak detector sees its first input.
    fn warm_up(&self) -> usize;

    /// Feeds a whole block and collects the detections in order.
    fn process_block(&mut self, samples: &[f64]) -> Vec<usize> {
        samples
            .iter()
            .filter_map(|&x| self.process_sample(x))
            .collect()
    }
}

/// Duration in seconds converted to whole samples.
pub(crate) fn samples(secs: f64, sample_rate: f64) -> usize {
    (secs * sample_rate) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_signals::pulse_train;

    #[test]
    fn test_detectors_as_trait_objects() {
        let signal = pulse_train(3000, 300, 5, 150, 1.0);
        let mut detectors: [alloc::boxed::Box<dyn RealTimeDetector>; 2] = [
            alloc::boxed::Box::new(PanTompkinsRealTime::new(250.0).unwrap()),
            alloc::boxed::Box::new(EngZeeRealTime::new(250.0).unwrap()),
        ];

        for detector in detectors.iter_mut() {
            assert_eq!(detector.sample_rate(), 250.0);
            let peaks = detector.process_block(&signal);
            assert_eq!(peaks.len(), 10);
            assert!(peaks.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_samples_truncates() {
        assert_eq!(samples(0.12, 250.0), 30);
        assert_eq!(samples(0.2, 360.0), 72);
        assert_eq!(samples(0.0085, 250.0), 2);
    }
}
