//! Adapter that turns an external causal filter into a pipeline stage.

use super::iir::{CausalFilter, IirFilter};
use crate::error::{check_sample_rate, ConfigError};
use crate::stage::{Output, StreamStage};

/// Band-pass or band-stop filter stage wrapping a [`CausalFilter`].
///
/// Never primes: every finite input yields a value. Settling inside the filter
/// is not modelled. Non-finite input is not fed to the filter (it would
/// corrupt the recursion for good) and is reported as [`Output::Pending`].
///
/// # Example
/// ```
/// use qrstream::{BandFilter, Output, StreamStage};
///
/// let mut notch = BandFilter::band_stop(4, 250.0, 48.0, 52.0).unwrap();
/// assert!(matches!(notch.advance(1.0), Output::Value(_)));
/// assert_eq!(notch.advance(f64::NAN), Output::Pending);
/// ```
#[derive(Debug, Clone)]
pub struct BandFilter<F = IirFilter> {
    filter: F,
}

impl<F: CausalFilter> BandFilter<F> {
    pub fn new(filter: F) -> Self {
        Self { filter }
    }

    pub fn inner(&self) -> &F {
        &self.filter
    }
}

impl BandFilter<IirFilter> {
    /// Band-pass between `low` and `high` Hz.
    pub fn band_pass(
        order: usize,
        sample_rate: f64,
        low: f64,
        high: f64,
    ) -> Result<Self, ConfigError> {
        let (center, width) = center_and_width(sample_rate, low, high)?;
        IirFilter::band_pass(order, sample_rate, center, width).map(Self::new)
    }

    /// Band-stop between `low` and `high` Hz.
    pub fn band_stop(
        order: usize,
        sample_rate: f64,
        low: f64,
        high: f64,
    ) -> Result<Self, ConfigError> {
        let (center, width) = center_and_width(sample_rate, low, high)?;
        IirFilter::band_stop(order, sample_rate, center, width).map(Self::new)
    }
}

/// Converts band edges to the (center, bandwidth) pair the filter design takes.
pub fn center_and_width(sample_rate: f64, low: f64, high: f64) -> Result<(f64, f64), ConfigError> {
    check_sample_rate(sample_rate)?;
    if !(low.is_finite() && high.is_finite() && low >= 0.0 && high > low) {
        return Err(ConfigError::InvalidBand {
            low,
            high,
            sample_rate,
        });
    }
    Ok(((high + low) / 2.0, libm::fabs(high - low)))
}

impl<F: CausalFilter> StreamStage for BandFilter<F> {
    #[inline]
    fn advance(&mut self, sample: f64) -> Output {
        if !sample.is_finite() {
            return Output::Pending;
        }
        Output::finite(self.filter.filter(sample))
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scales by a constant and counts resets.
    struct Gain {
        gain: f64,
        resets: usize,
    }

    impl CausalFilter for Gain {
        fn filter(&mut self, sample: f64) -> f64 {
            self.gain * sample
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    #[test]
    fn test_center_and_width() {
        assert_eq!(center_and_width(250.0, 5.0, 15.0).unwrap(), (10.0, 10.0));
        assert_eq!(center_and_width(250.0, 48.0, 52.0).unwrap(), (50.0, 4.0));
        assert!(center_and_width(250.0, 15.0, 5.0).is_err());
        assert!(center_and_width(250.0, -1.0, 5.0).is_err());
        assert!(center_and_width(-250.0, 5.0, 15.0).is_err());
    }

    #[test]
    fn test_external_filter_adapter() {
        let mut stage = BandFilter::new(Gain {
            gain: 2.0,
            resets: 0,
        });
        assert_eq!(stage.advance(1.5), Output::Value(3.0));
        assert_eq!(stage.advance(f64::INFINITY), Output::Pending);
        assert_eq!(stage.warm_up(), 0);

        stage.reset();
        assert_eq!(stage.inner().resets, 1);
    }

    #[test]
    fn test_nan_does_not_reach_filter() {
        let mut with_gap = BandFilter::band_pass(1, 250.0, 5.0, 15.0).unwrap();
        let mut clean = BandFilter::band_pass(1, 250.0, 5.0, 15.0).unwrap();

        with_gap.advance(1.0);
        clean.advance(1.0);
        assert!(with_gap.advance(f64::NAN).is_pending());

        // The recursion is untouched by the rejected sample
        assert_eq!(with_gap.advance(0.5), clean.advance(0.5));
    }

    #[test]
    fn test_pass_band_above_nyquist_rejected() {
        assert!(BandFilter::band_pass(1, 20.0, 5.0, 15.0).is_err());
    }
}
