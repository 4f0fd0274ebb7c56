//! Fixed-width modular arithmetic and numeric ordering.
//!
//! Values are processed as little-endian `u64` limbs taken from the
//! least significant (trailing) end of the vector.

use super::vector::{BitVector, BitsError};
use std::cmp::Ordering;

impl BitVector {
    /// `(self + other) mod 2^w` for operands of equal width `w`.
    pub fn binary_add(&self, other: &BitVector) -> Result<BitVector, BitsError> {
        let width = self.check_width(other)?;
        let a = self.to_limbs_le();
        let b = other.to_limbs_le();

        let mut carry = false;
        let sum: Vec<u64> = a
            .iter()
            .zip(&b)
            .map(|(&x, &y)| {
                let (s1, c1) = x.overflowing_add(y);
                let (s2, c2) = s1.overflowing_add(u64::from(carry));
                carry = c1 || c2;
                s2
            })
            .collect();

        Ok(Self::from_limbs_le(width, &sum))
    }

    /// `(self * other) mod 2^w` for operands of equal width `w`.
    pub fn binary_mul(&self, other: &BitVector) -> Result<BitVector, BitsError> {
        let width = self.check_width(other)?;
        let a = self.to_limbs_le();
        let b = other.to_limbs_le();
        let n = a.len();

        // Truncated schoolbook: limbs at or above n are discarded by the modulus.
        let mut product = vec![0u64; n];
        for i in 0..n {
            let mut carry = 0u128;
            for j in 0..n - i {
                let t = u128::from(a[i]) * u128::from(b[j]) + u128::from(product[i + j]) + carry;
                product[i + j] = t as u64;
                carry = t >> 64;
            }
        }

        Ok(Self::from_limbs_le(width, &product))
    }

    /// Numeric ordering, treating both vectors as unsigned big integers.
    ///
    /// Leading zeros are insignificant, so `"0001"` and `"1"` compare equal
    /// even though they are not [`BitVector::equals`].
    pub fn compare(&self, other: &BitVector) -> Ordering {
        let a = self.to_limbs_le();
        let b = other.to_limbs_le();
        let common = a.len().min(b.len());

        if a[common..].iter().any(|&limb| limb != 0) {
            return Ordering::Greater;
        }
        if b[common..].iter().any(|&limb| limb != 0) {
            return Ordering::Less;
        }

        (0..common)
            .rev()
            .map(|i| a[i].cmp(&b[i]))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    fn check_width(&self, other: &BitVector) -> Result<usize, BitsError> {
        if self.len() != other.len() {
            return Err(BitsError::WidthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        Ok(self.len())
    }

    pub(crate) fn to_limbs_le(&self) -> Vec<u64> {
        let mut limbs = vec![0u64; self.len().div_ceil(64)];
        for (pos, bit) in self.as_slice().iter().rev().enumerate() {
            if *bit {
                limbs[pos / 64] |= 1 << (pos % 64);
            }
        }
        limbs
    }

    pub(crate) fn from_limbs_le(width: usize, limbs: &[u64]) -> BitVector {
        (0..width)
            .rev()
            .map(|pos| {
                limbs
                    .get(pos / 64)
                    .is_some_and(|limb| (limb >> (pos % 64)) & 1 == 1)
            })
            .collect()
    }
}
