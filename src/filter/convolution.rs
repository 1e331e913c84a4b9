use alloc::boxed::Box;

use crate::error::ConfigError;
use crate::ring::RingBuffer;
use crate::stage::{Output, StreamStage};

/// Causal convolution with a fixed kernel.
///
/// Output at sample `n` is `sum_k kernel[k] * x[n - k]`, defined only once
/// `kernel.len()` samples are held. Compared with a centered convolution this
/// lags by `(len - 1) / 2` samples.
///
/// # Example
/// ```
/// use qrstream::{Convolution, Output, StreamStage};
///
/// let mut conv = Convolution::new(&[1.0, 2.0]).unwrap();
/// assert_eq!(conv.advance(1.0), Output::Pending);
/// assert_eq!(conv.advance(10.0), Output::Value(12.0));
/// ```
#[derive(Debug, Clone)]
pub struct Convolution {
    kernel: Box<[f64]>,
    window: RingBuffer<f64>,
}

impl Convolution {
    pub fn new(kernel: &[f64]) -> Result<Self, ConfigError> {
        if kernel.is_empty() {
            return Err(ConfigError::EmptyKernel);
        }
        Ok(Self {
            kernel: kernel.into(),
            window: RingBuffer::new(kernel.len()),
        })
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }
}

impl StreamStage for Convolution {
    fn advance(&mut self, sample: f64) -> Output {
        self.window.push(sample);
        if !self.window.is_full() {
            return Output::Pending;
        }

        // Oldest sample meets the last tap
        let n = self.kernel.len();
        let acc = self
            .window
            .iter()
            .enumerate()
            .fold(0.0, |acc, (j, x)| acc + x * self.kernel[n - 1 - j]);
        Output::finite(acc)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn warm_up(&self) -> usize {
        self.kernel.len() - 1
    }
}
