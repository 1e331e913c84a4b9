use crate::stage::{Output, StreamStage};

/// Pointwise squaring. Stateless; never primes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Square;

impl StreamStage for Square {
    #[inline]
    fn advance(&mut self, sample: f64) -> Output {
        Output::finite(sample * sample)
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square() {
        let mut sq = Square;
        assert_eq!(sq.advance(-3.0), Output::Value(9.0));
        assert_eq!(sq.advance(0.5), Output::Value(0.25));
        assert!(sq.advance(f64::NAN).is_pending());
        // Overflow to infinity is not a value
        assert!(sq.advance(1e200).is_pending());
    }
}
