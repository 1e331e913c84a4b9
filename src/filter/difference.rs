use crate::error::ConfigError;
use crate::ring::RingBuffer;
use crate::stage::{Output, StreamStage};

/// Fixed-offset difference: `y[n] = x[n] - x[n - offset]`.
///
/// A discrete derivative approximation. Reports [`Output::Pending`] until
/// `offset + 1` samples have been seen.
///
/// # Example
/// ```
/// use qrstream::{MovingDifference, Output, StreamStage};
///
/// let mut diff = MovingDifference::new(2).unwrap();
/// assert_eq!(diff.advance(1.0), Output::Pending);
/// assert_eq!(diff.advance(2.0), Output::Pending);
/// assert_eq!(diff.advance(4.0), Output::Value(3.0));
/// ```
#[derive(Debug, Clone)]
pub struct MovingDifference {
    offset: usize,
    history: RingBuffer<f64>,
}

impl MovingDifference {
    pub fn new(offset: usize) -> Result<Self, ConfigError> {
        if offset == 0 {
            return Err(ConfigError::ZeroOffset);
        }
        Ok(Self {
            offset,
            history: RingBuffer::new(offset + 1),
        })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl StreamStage for MovingDifference {
    fn advance(&mut self, sample: f64) -> Output {
        self.history.push(sample);
        match self.history.oldest() {
            Some(past) if self.history.is_full() => Output::finite(sample - past),
            _ => Output::Pending,
        }
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn warm_up(&self) -> usize {
        self.offset
    }
}
