//! Affine universal hash used to confirm agreement.

use crate::bits::{BitVector, BitsError};
use crate::source::{EntropySource, SourceError};

/// `secret * pad_a + pad_b mod 2^w`, all operands of width `w`.
pub fn hash(
    secret: &BitVector,
    pad_a: &BitVector,
    pad_b: &BitVector,
) -> Result<BitVector, BitsError> {
    secret.binary_mul(pad_a)?.binary_add(pad_b)
}

/// A member of the affine hash family, selected by two public pads.
///
/// Not a MAC: it detects accidental disagreement, not tampering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalHash {
    pad_a: BitVector,
    pad_b: BitVector,
}

impl UniversalHash {
    /// Builds a hash from pads of equal width.
    pub fn new(pad_a: BitVector, pad_b: BitVector) -> Result<Self, BitsError> {
        if pad_a.len() != pad_b.len() {
            return Err(BitsError::WidthMismatch {
                left: pad_a.len(),
                right: pad_b.len(),
            });
        }
        Ok(Self { pad_a, pad_b })
    }

    /// Draws fresh pads of `width` bits from `source`.
    pub fn draw<S: EntropySource + ?Sized>(
        source: &mut S,
        width: usize,
    ) -> Result<Self, SourceError> {
        let pad_a = source.get_bits(width)?;
        let pad_b = source.get_bits(width)?;
        Ok(Self { pad_a, pad_b })
    }

    /// Width of both pads.
    pub fn width(&self) -> usize {
        self.pad_a.len()
    }

    /// The multiplicative pad.
    pub fn pad_a(&self) -> &BitVector {
        &self.pad_a
    }

    /// The additive pad.
    pub fn pad_b(&self) -> &BitVector {
        &self.pad_b
    }

    /// Public seed for the per-round shuffle: the trailing 64 bits of `pad_a`.
    pub fn shuffle_seed(&self) -> u64 {
        self.pad_a.low_u64()
    }

    /// Hashes `secret`, which must match the pad width.
    pub fn hash(&self, secret: &BitVector) -> Result<BitVector, BitsError> {
        hash(secret, &self.pad_a, &self.pad_b)
    }

    /// True iff `secret` hashes to exactly `expected`.
    pub fn verify(&self, secret: &BitVector, expected: &BitVector) -> Result<bool, BitsError> {
        Ok(self.hash(secret)?.equals(expected))
    }

    /// Pads cut down to their first `len` bits, for a shrunken secret.
    pub fn truncated(&self, len: usize) -> Result<Self, BitsError> {
        Ok(Self {
            pad_a: self.pad_a.first(len)?,
            pad_b: self.pad_b.first(len)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PseudoRandomExtractor;

    fn int(width: usize, value: u64) -> BitVector {
        BitVector::from_int(width, value).unwrap()
    }

    #[test]
    fn test_hash_is_affine() {
        let h = hash(&int(8, 7), &int(8, 3), &int(8, 5)).unwrap();
        assert_eq!(h.to_int().unwrap(), (7 * 3 + 5) % 256);
    }

    #[test]
    fn test_verify_detects_low_bit_error() {
        let pads = UniversalHash::new(int(16, 0x1235), int(16, 0x0F0F)).unwrap();
        let secret = int(16, 0xBEEF);
        let expected = pads.hash(&secret).unwrap();

        assert!(pads.verify(&secret, &expected).unwrap());
        // An odd pad_a is invertible mod 2^w, so any change is detected.
        assert!(!pads.verify(&int(16, 0xBEEE), &expected).unwrap());
    }

    #[test]
    fn test_pad_width_mismatch() {
        assert!(UniversalHash::new(int(8, 1), int(9, 1)).is_err());
        let pads = UniversalHash::new(int(8, 1), int(8, 1)).unwrap();
        assert!(pads.hash(&int(9, 1)).is_err());
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        let mut source = PseudoRandomExtractor::new(8);
        let pads = UniversalHash::draw(&mut source, 64).unwrap();
        let short = pads.truncated(40).unwrap();

        assert_eq!(short.width(), 40);
        assert_eq!(short.pad_a(), &pads.pad_a().first(40).unwrap());
        assert!(pads.truncated(65).is_err());
    }

    #[test]
    fn test_deterministic() {
        let pads = UniversalHash::draw(&mut PseudoRandomExtractor::new(1), 128).unwrap();
        let secret = BitVector::from_bytes(&[0x33; 16]);
        assert_eq!(pads.hash(&secret).unwrap(), pads.hash(&secret).unwrap());
    }
}
