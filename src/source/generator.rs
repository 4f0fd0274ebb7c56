//! Typed draws on top of an entropy source.

use super::{EntropySource, SourceError};

/// Produces booleans, integers and floats from raw source bits.
pub struct Generator<S> {
    source: S,
}

impl<S: EntropySource> Generator<S> {
    /// Wraps a source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// A single random bit.
    pub fn next_bool(&mut self) -> Result<bool, SourceError> {
        Ok(self.source.get_bits(1)?.at(0)?)
    }

    /// An integer made of `n <= 64` random bits.
    pub fn next_bits(&mut self, n: usize) -> Result<u64, SourceError> {
        Ok(self.source.get_bits(n)?.to_int()?)
    }

    /// A uniformly distributed 64-bit integer.
    pub fn next_u64(&mut self) -> Result<u64, SourceError> {
        self.next_bits(64)
    }

    /// An IEEE-754 double assembled from random sign, exponent and fraction
    /// fields. Covers the whole representable range, including infinities
    /// and NaN.
    pub fn next_f64(&mut self) -> Result<f64, SourceError> {
        let sign = self.next_bits(1)?;
        let fraction = self.next_bits(52)?;
        let exponent = self.next_bits(11)?;
        Ok(f64::from_bits((sign << 63) | (exponent << 52) | fraction))
    }

    /// A uniformly distributed integer in `lo..hi`.
    pub fn next_int_between(&mut self, lo: u64, hi: u64) -> Result<u64, SourceError> {
        if hi <= lo {
            return Err(SourceError::InvalidParameter(format!(
                "empty range {}..{}",
                lo, hi
            )));
        }
        let range = hi - lo;
        if range == 1 {
            return Ok(lo);
        }

        // Rejection sampling over the smallest covering power of two.
        let bits = (64 - (range - 1).leading_zeros()) as usize;
        loop {
            let candidate = self.next_bits(bits)?;
            if candidate < range {
                return Ok(lo + candidate);
            }
        }
    }

    /// A uniformly distributed float in `[0, 1)` with 53 bits of precision.
    pub fn next_normalized_f64(&mut self) -> Result<f64, SourceError> {
        Ok(self.next_bits(53)? as f64 / (1u64 << 53) as f64)
    }

    /// Mutable access to the wrapped source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unwraps the source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVector;
    use crate::source::PseudoRandomExtractor;

    struct Fixed(BitVector);

    impl EntropySource for Fixed {
        fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
            Ok(self.0.first(n)?)
        }
    }

    #[test]
    fn test_bounded_integers_in_range() {
        let mut rng = Generator::new(PseudoRandomExtractor::new(3));
        for _ in 0..1000 {
            let v = rng.next_int_between(10, 17).unwrap();
            assert!((10..17).contains(&v));
        }
        assert_eq!(rng.next_int_between(5, 6).unwrap(), 5);
        assert!(rng.next_int_between(6, 6).is_err());
    }

    #[test]
    fn test_normalized_float_in_unit_interval() {
        let mut rng = Generator::new(PseudoRandomExtractor::new(4));
        for _ in 0..1000 {
            let v = rng.next_normalized_f64().unwrap();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_float_layout_from_fixed_bits() {
        // sign 0, fraction 0, exponent 1023 => 1.0
        let bits = BitVector::from_bits("0")
            .unwrap()
            .extend(&BitVector::zeros(52))
            .extend(&BitVector::from_int(11, 1023).unwrap());
        let mut stream = bits;
        let mut rng = Generator::new(StreamSource(&mut stream));
        assert_eq!(rng.next_f64().unwrap(), 1.0);
    }

    struct StreamSource<'a>(&'a mut BitVector);

    impl EntropySource for StreamSource<'_> {
        fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
            let head = self.0.first(n)?;
            *self.0 = self.0.substring(n, self.0.len() - n)?;
            Ok(head)
        }
    }

    #[test]
    fn test_bool_and_u64_from_fixed_source() {
        let mut rng = Generator::new(Fixed(BitVector::from_bytes(&[0xFF; 8])));
        assert!(rng.next_bool().unwrap());
        assert_eq!(rng.next_u64().unwrap(), u64::MAX);
    }
}
