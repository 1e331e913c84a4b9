use crate::error::ConfigError;
use crate::ring::RingBuffer;
use crate::stage::{Output, StreamStage};

/// Moving window average over the most recent `window` samples.
///
/// Always defined: while the window is still filling, the mean is taken over
/// the samples seen so far, so the very first output equals the first input.
/// The sum is recomputed from the window on every call, which keeps a stray
/// non-finite sample from poisoning the average for longer than one window.
///
/// # Example
/// ```
/// use qrstream::{MovingWindowAverage, Output, StreamStage};
///
/// let mut mwa = MovingWindowAverage::new(3).unwrap();
/// assert_eq!(mwa.advance(3.0), Output::Value(3.0));
/// assert_eq!(mwa.advance(5.0), Output::Value(4.0));
/// assert_eq!(mwa.advance(7.0), Output::Value(5.0));
/// assert_eq!(mwa.advance(9.0), Output::Value(7.0));
/// ```
#[derive(Debug, Clone)]
pub struct MovingWindowAverage {
    window: RingBuffer<f64>,
}

impl MovingWindowAverage {
    pub fn new(window: usize) -> Result<Self, ConfigError> {
        let window = RingBuffer::try_new(window).map_err(|_| ConfigError::EmptyWindow {
            stage: "moving window average",
        })?;
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window.capacity()
    }
}

impl StreamStage for MovingWindowAverage {
    fn advance(&mut self, sample: f64) -> Output {
        self.window.push(sample);
        let sum: f64 = self.window.iter().sum();
        Output::finite(sum / self.window.len() as f64)
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growing_then_fixed_window() {
        let mut mwa = MovingWindowAverage::new(4).unwrap();
        let out: [f64; 6] =
            core::array::from_fn(|i| mwa.advance((i + 1) as f64).value().unwrap());
        assert_eq!(out, [1.0, 1.5, 2.0, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_window_one_is_identity() {
        let mut mwa = MovingWindowAverage::new(1).unwrap();
        for x in [0.5, -3.0, 8.0] {
            assert_eq!(mwa.advance(x), Output::Value(x));
        }
    }

    #[test]
    fn test_empty_window_rejected() {
        assert!(matches!(
            MovingWindowAverage::new(0),
            Err(ConfigError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_nan_leaves_after_one_window() {
        let mut mwa = MovingWindowAverage::new(2).unwrap();
        mwa.advance(1.0);
        assert!(mwa.advance(f64::NAN).is_pending());
        assert!(mwa.advance(1.0).is_pending());
        assert_eq!(mwa.advance(3.0), Output::Value(2.0));
    }

    #[test]
    fn test_reset() {
        let mut mwa = MovingWindowAverage::new(3).unwrap();
        mwa.advance(100.0);
        mwa.advance(200.0);
        mwa.reset();
        assert_eq!(mwa.advance(6.0), Output::Value(6.0));
        assert_eq!(mwa.window(), 3);
    }
}
