use alloc::vec;
use alloc::vec::Vec;

use crate::error::{check_sample_rate, ConfigError};

/// Biquad (2nd-order IIR) filter coefficients.
///
/// Implements the difference equation:
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
///
/// Note: a0 is assumed to be 1.0 (normalized form)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Creates coefficients for a simple passthrough filter (no filtering)
    pub const fn passthrough() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Band-pass section with unity gain at `center`.
    ///
    /// # Arguments
    /// * `sample_rate` - Sampling frequency in Hz
    /// * `center` - Center frequency in Hz
    /// * `bandwidth` - Width of the pass band in Hz
    pub fn band_pass(sample_rate: f64, center: f64, bandwidth: f64) -> Self {
        let (cos_omega, alpha) = Self::prewarp(sample_rate, center, bandwidth);

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;
        let b0 = alpha;
        let b1 = 0.0;
        let b2 = -alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Band-stop (notch) section with a zero at `center`.
    ///
    /// # Arguments
    /// * `sample_rate` - Sampling frequency in Hz
    /// * `center` - Rejected frequency in Hz
    /// * `bandwidth` - Width of the stop band in Hz
    pub fn band_stop(sample_rate: f64, center: f64, bandwidth: f64) -> Self {
        let (cos_omega, alpha) = Self::prewarp(sample_rate, center, bandwidth);

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;
        let b0 = 1.0;
        let b1 = -2.0 * cos_omega;
        let b2 = 1.0;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    fn prewarp(sample_rate: f64, center: f64, bandwidth: f64) -> (f64, f64) {
        use core::f64::consts::PI;

        let omega = 2.0 * PI * center / sample_rate;
        let bw = 2.0 * PI * bandwidth / sample_rate;
        let alpha = libm::sin(omega) * libm::sinh(bw / 2.0);
        (libm::cos(omega), alpha)
    }
}

/// A stateful, deterministic, causal single-channel filter.
///
/// This is the seam for the band filters in front of each detector: anything
/// that maps one sample to one sample and can be reset plugs into
/// [`BandFilter`](crate::BandFilter).
pub trait CausalFilter {
    fn filter(&mut self, sample: f64) -> f64;

    fn reset(&mut self);
}

/// IIR filter built from cascaded biquad sections.
///
/// The number of sections is chosen at runtime from the requested order:
/// `band_pass(order, ..)` and `band_stop(order, ..)` cascade `order` sections.
///
/// # Memory Layout
/// - `coeffs`: One biquad coefficient set per section
/// - `state`: Delay line storing [x1, x2, y1, y2] for each section
///
/// # Example
/// ```
/// # use qrstream::IirFilter;
/// // 5-15 Hz band-pass at 250 Hz
/// let mut filter = IirFilter::band_pass(1, 250.0, 10.0, 10.0).unwrap();
///
/// let filtered = filter.process_sample(0.5);
/// assert!(filtered.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct IirFilter {
    coeffs: Vec<BiquadCoeffs>,
    // State: [x1, x2, y1, y2] for each section
    state: Vec<[f64; 4]>,
}

impl IirFilter {
    /// Creates a new IIR filter from biquad sections.
    pub fn new(coeffs: Vec<BiquadCoeffs>) -> Self {
        let state = vec![[0.0; 4]; coeffs.len()];
        Self { coeffs, state }
    }

    /// Order-`order` band-pass around `center` Hz, `bandwidth` Hz wide.
    ///
    /// The centre must lie strictly between 0 Hz and Nyquist.
    pub fn band_pass(
        order: usize,
        sample_rate: f64,
        center: f64,
        bandwidth: f64,
    ) -> Result<Self, ConfigError> {
        Self::check(order, sample_rate, center, bandwidth)?;
        if center >= sample_rate / 2.0 {
            return Err(Self::band_error(sample_rate, center, bandwidth));
        }

        let section = BiquadCoeffs::band_pass(sample_rate, center, bandwidth);
        Ok(Self::new(vec![section; order]))
    }

    /// Order-`order` band-stop around `center` Hz, `bandwidth` Hz wide.
    ///
    /// A centre at or above Nyquist leaves nothing to reject, so the sections
    /// become passthroughs.
    pub fn band_stop(
        order: usize,
        sample_rate: f64,
        center: f64,
        bandwidth: f64,
    ) -> Result<Self, ConfigError> {
        Self::check(order, sample_rate, center, bandwidth)?;

        let section = if center < sample_rate / 2.0 {
            BiquadCoeffs::band_stop(sample_rate, center, bandwidth)
        } else {
            log::debug!(
                "band-stop at {} Hz is above Nyquist for {} Hz, using passthrough",
                center,
                sample_rate
            );
            BiquadCoeffs::passthrough()
        };
        Ok(Self::new(vec![section; order]))
    }

    fn check(order: usize, sample_rate: f64, center: f64, bandwidth: f64) -> Result<(), ConfigError> {
        check_sample_rate(sample_rate)?;
        if order == 0 {
            return Err(ConfigError::ZeroOrder);
        }
        let valid = center.is_finite() && bandwidth.is_finite() && center > 0.0 && bandwidth > 0.0;
        if !valid {
            return Err(Self::band_error(sample_rate, center, bandwidth));
        }
        Ok(())
    }

    fn band_error(sample_rate: f64, center: f64, bandwidth: f64) -> ConfigError {
        ConfigError::InvalidBand {
            low: center - bandwidth / 2.0,
            high: center + bandwidth / 2.0,
            sample_rate,
        }
    }

    /// Processes a single sample through all cascaded sections.
    #[inline]
    pub fn process_sample(&mut self, input: f64) -> f64 {
        let mut x = input;

        for (c, s) in self.coeffs.iter().zip(self.state.iter_mut()) {
            // Direct Form I: y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
            let y = c.b0 * x + c.b1 * s[0] + c.b2 * s[1] - c.a1 * s[2] - c.a2 * s[3];

            s[1] = s[0]; // x[n-2] = x[n-1]
            s[0] = x; // x[n-1] = x[n]
            s[3] = s[2]; // y[n-2] = y[n-1]
            s[2] = y; // y[n-1] = y[n]

            x = y;
        }

        x
    }

    /// Processes multiple samples in place.
    pub fn process_block(&mut self, samples: &mut [f64]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Resets filter state to zero (clears delay lines).
    pub fn reset(&mut self) {
        for s in self.state.iter_mut() {
            *s = [0.0; 4];
        }
    }

    pub fn coefficients(&self) -> &[BiquadCoeffs] {
        &self.coeffs
    }

    /// Number of cascaded sections.
    pub fn order(&self) -> usize {
        self.coeffs.len()
    }
}

impl CausalFilter for IirFilter {
    #[inline]
    fn filter(&mut self, sample: f64) -> f64 {
        self.process_sample(sample)
    }

    fn reset(&mut self) {
        IirFilter::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Peak amplitude of a sine after the filter has settled.
    fn steady_amplitude(filter: &mut IirFilter, freq: f64, sample_rate: f64) -> f64 {
        use core::f64::consts::PI;

        let settle = (2.0 * sample_rate) as usize;
        let measure = sample_rate as usize;
        let mut max = 0.0f64;
        for i in 0..(settle + measure) {
            let x = libm::sin(2.0 * PI * freq * i as f64 / sample_rate);
            let y = filter.process_sample(x);
            if i >= settle {
                max = max.max(libm::fabs(y));
            }
        }
        max
    }

    #[test]
    fn test_iir_passthrough() {
        let mut filter = IirFilter::new(vec![BiquadCoeffs::passthrough()]);

        // Passthrough should not change the signal
        assert_eq!(filter.process_sample(1.0), 1.0);
        assert_eq!(filter.process_sample(2.5), 2.5);
        assert_eq!(filter.process_sample(-1.5), -1.5);
    }

    #[test]
    fn test_band_pass_rejects_dc() {
        let mut filter = IirFilter::band_pass(1, 250.0, 10.0, 10.0).unwrap();

        for _ in 0..1000 {
            filter.process_sample(1.0);
        }

        let output = filter.process_sample(1.0);
        assert!(libm::fabs(output) < 1e-3, "DC should be rejected, got {}", output);
    }

    #[test]
    fn test_band_pass_unity_at_center() {
        let mut filter = IirFilter::band_pass(1, 250.0, 10.0, 10.0).unwrap();
        let gain = steady_amplitude(&mut filter, 10.0, 250.0);
        assert!(libm::fabs(gain - 1.0) < 0.02, "center gain {}", gain);

        filter.reset();
        let gain_high = steady_amplitude(&mut filter, 60.0, 250.0);
        assert!(gain_high < 0.3, "60 Hz should be attenuated, got {}", gain_high);
    }

    #[test]
    fn test_band_stop_removes_mains() {
        let mut filter = IirFilter::band_stop(4, 250.0, 50.0, 4.0).unwrap();
        assert_eq!(filter.order(), 4);

        let at_mains = steady_amplitude(&mut filter, 50.0, 250.0);
        assert!(at_mains < 0.01, "50 Hz should be removed, got {}", at_mains);

        filter.reset();
        let at_qrs = steady_amplitude(&mut filter, 10.0, 250.0);
        assert!(at_qrs > 0.95, "10 Hz should pass, got {}", at_qrs);
    }

    #[test]
    fn test_band_stop_above_nyquist_is_passthrough() {
        let filter = IirFilter::band_stop(2, 80.0, 50.0, 4.0).unwrap();
        for c in filter.coefficients() {
            assert_eq!(*c, BiquadCoeffs::passthrough());
        }
    }

    #[test]
    fn test_invalid_construction() {
        assert_eq!(
            IirFilter::band_pass(0, 250.0, 10.0, 10.0).unwrap_err(),
            ConfigError::ZeroOrder
        );
        assert!(matches!(
            IirFilter::band_pass(1, 0.0, 10.0, 10.0),
            Err(ConfigError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            IirFilter::band_pass(1, 250.0, 200.0, 10.0),
            Err(ConfigError::InvalidBand { .. })
        ));
        assert!(matches!(
            IirFilter::band_stop(1, 250.0, 50.0, 0.0),
            Err(ConfigError::InvalidBand { .. })
        ));
    }

    #[test]
    fn test_iir_process_block() {
        let mut filter = IirFilter::band_pass(1, 250.0, 10.0, 10.0).unwrap();

        let mut samples = [1.0, 2.0, 3.0, 4.0, 5.0];
        filter.process_block(&mut samples);

        assert_ne!(samples, [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_iir_reset() {
        let mut filter = IirFilter::band_stop(2, 250.0, 50.0, 4.0).unwrap();

        for i in 0..10 {
            filter.process_sample(i as f64);
        }

        filter.reset();

        let mut fresh = IirFilter::band_stop(2, 250.0, 50.0, 4.0).unwrap();
        for x in [5.0, -1.0, 0.25] {
            assert_eq!(filter.process_sample(x), fresh.process_sample(x));
        }
    }
}
