//! Construction-time configuration errors.

use thiserror::Error;

/// Invalid parameters rejected when a stage, filter or detector is built.
///
/// Nothing on the per-sample path returns an error; anything that could go
/// wrong structurally is caught here, before the first sample.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("sampling frequency must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("{stage} window must hold at least one sample")]
    EmptyWindow { stage: &'static str },

    #[error("convolution kernel is empty")]
    EmptyKernel,

    #[error("moving difference offset must be at least 1")]
    ZeroOffset,

    #[error("filter order must be at least 1")]
    ZeroOrder,

    #[error("invalid band {low}..{high} Hz for sampling frequency {sample_rate} Hz")]
    InvalidBand { low: f64, high: f64, sample_rate: f64 },

    #[error("detection threshold must be non-negative and finite, got {0}")]
    InvalidThreshold(f64),

    #[error("{name} must be non-negative and finite, got {secs} s")]
    InvalidDuration { name: &'static str, secs: f64 },
}

/// Checks a sampling frequency.
pub(crate) fn check_sample_rate(sample_rate: f64) -> Result<(), ConfigError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSampleRate(sample_rate))
    }
}

/// Checks a duration given in seconds.
pub(crate) fn check_duration(name: &'static str, secs: f64) -> Result<(), ConfigError> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { name, secs })
    }
}
