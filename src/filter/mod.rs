mod band;
mod convolution;
mod difference;
mod iir;
mod mwa;
mod square;

pub use band::{center_and_width, BandFilter};
pub use convolution::Convolution;
pub use difference::MovingDifference;
pub use iir::{BiquadCoeffs, CausalFilter, IirFilter};
pub use mwa::MovingWindowAverage;
pub use square::Square;
