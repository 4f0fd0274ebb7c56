//! Owned, growable sequence of bits.
//!
//! Index 0 is the most significant (first produced) bit. Every slicing
//! operation returns an independent copy; the only in-place mutators are
//! [`BitVector::add`] and [`BitVector::invert`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced by bit vector construction and access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitsError {
    #[error("invalid character {found:?} at position {position} in bit literal")]
    Format { found: char, position: usize },

    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },

    #[error("range {start}..{end} out of bounds for length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    #[error("operand widths differ: {left} bits vs {right} bits")]
    WidthMismatch { left: usize, right: usize },

    #[error("integer width {0} exceeds 64 bits")]
    WidthTooLarge(usize),

    #[error("cannot represent {0} bits as a 64-bit integer")]
    Overflow(usize),
}

/// An ordered, indexable sequence of bits.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitVector {
    bits: Vec<bool>,
}

impl BitVector {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vector of `len` zero bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Parses a literal made only of `'0'` and `'1'` characters.
    pub fn from_bits(s: &str) -> Result<Self, BitsError> {
        s.chars()
            .enumerate()
            .map(|(position, c)| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                found => Err(BitsError::Format { found, position }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|bits| Self { bits })
    }

    /// Expands bytes into bits, most significant bit of each byte first.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let bits = bytes
            .iter()
            .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1))
            .collect();
        Self { bits }
    }

    /// Encodes the low `width` bits of `value`, most significant first.
    pub fn from_int(width: usize, value: u64) -> Result<Self, BitsError> {
        if width > 64 {
            return Err(BitsError::WidthTooLarge(width));
        }
        Ok(Self::from_u64(width, value))
    }

    pub(crate) fn from_u64(width: usize, value: u64) -> Self {
        debug_assert!(width <= 64);
        let bits = (0..width)
            .rev()
            .map(|shift| (value >> shift) & 1 == 1)
            .collect();
        Self { bits }
    }

    /// Every vector of length `n`, in ascending numeric order.
    ///
    /// Intended for small `n`; the result holds `2^n` vectors.
    pub fn all_of_length(n: usize) -> Vec<Self> {
        if n == 0 {
            return vec![Self::new()];
        }
        (0..1u64 << n).map(|v| Self::from_u64(n, v)).collect()
    }

    /// Number of bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if the vector holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Reads bit `i`.
    pub fn at(&self, i: usize) -> Result<bool, BitsError> {
        self.bits.get(i).copied().ok_or(BitsError::OutOfBounds {
            index: i,
            len: self.len(),
        })
    }

    /// Appends one bit.
    pub fn add(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Flips bit `i` in place.
    pub fn invert(&mut self, i: usize) -> Result<(), BitsError> {
        let len = self.len();
        let bit = self
            .bits
            .get_mut(i)
            .ok_or(BitsError::OutOfBounds { index: i, len })?;
        *bit = !*bit;
        Ok(())
    }

    /// Copy of the first `n` bits.
    pub fn first(&self, n: usize) -> Result<Self, BitsError> {
        self.substring(0, n)
    }

    /// Copy of `len` bits starting at `start`.
    pub fn substring(&self, start: usize, len: usize) -> Result<Self, BitsError> {
        let end = start.saturating_add(len);
        self.bits
            .get(start..end)
            .map(|slice| Self {
                bits: slice.to_vec(),
            })
            .ok_or(BitsError::RangeOutOfBounds {
                start,
                end,
                len: self.len(),
            })
    }

    /// Concatenation of `self` followed by `other`. Neither operand changes.
    pub fn extend(&self, other: &BitVector) -> Self {
        let mut bits = Vec::with_capacity(self.len() + other.len());
        bits.extend_from_slice(&self.bits);
        bits.extend_from_slice(&other.bits);
        Self { bits }
    }

    /// Splits into blocks of `block_len`, dropping a shorter remainder.
    ///
    /// A zero `block_len` yields no blocks.
    pub fn partition(&self, block_len: usize) -> Vec<Self> {
        if block_len == 0 {
            return Vec::new();
        }
        self.bits
            .chunks_exact(block_len)
            .map(|chunk| Self {
                bits: chunk.to_vec(),
            })
            .collect()
    }

    /// Splits into blocks of `block_len`, keeping a shorter final block.
    pub fn partition_extra(&self, block_len: usize) -> Vec<Self> {
        if block_len == 0 {
            return Vec::new();
        }
        self.bits
            .chunks(block_len)
            .map(|chunk| Self {
                bits: chunk.to_vec(),
            })
            .collect()
    }

    /// Number of set bits.
    pub fn ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Fraction of set bits; 0.0 for an empty vector.
    pub fn proportion(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.ones() as f64 / self.len() as f64
    }

    /// Parity of the set bits (`ones() mod 2`).
    #[inline]
    pub fn parity(&self) -> bool {
        self.ones() % 2 == 1
    }

    /// True iff `pattern` occurs starting at `offset`.
    ///
    /// Callers must keep `offset + pattern.len() <= len()`; a window that
    /// runs past the end never matches.
    pub fn has_pattern_at(&self, pattern: &BitVector, offset: usize) -> bool {
        self.bits
            .get(offset..offset.saturating_add(pattern.len()))
            .is_some_and(|window| window == pattern.bits.as_slice())
    }

    /// Count of positions where both vectors are set, over the shorter length.
    pub fn inner_product(&self, other: &BitVector) -> usize {
        self.bits
            .iter()
            .zip(&other.bits)
            .filter(|&(&a, &b)| a && b)
            .count()
    }

    /// Big-endian value of the vector.
    ///
    /// Vectors longer than 64 bits fail with [`BitsError::Overflow`]; use
    /// [`BitVector::low_u64`] to take the least significant 64 bits instead.
    pub fn to_int(&self) -> Result<u64, BitsError> {
        if self.len() > 64 {
            return Err(BitsError::Overflow(self.len()));
        }
        Ok(self.low_u64())
    }

    /// Value of the least significant (trailing) 64 bits.
    pub fn low_u64(&self) -> u64 {
        let start = self.len().saturating_sub(64);
        self.bits[start..]
            .iter()
            .fold(0u64, |acc, &b| (acc << 1) | u64::from(b))
    }

    /// Packs into bytes, dropping trailing bits that do not fill a byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bits
            .chunks_exact(8)
            .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | u8::from(b)))
            .collect()
    }

    /// True iff both vectors have the same length and identical bits.
    #[inline]
    pub fn equals(&self, other: &BitVector) -> bool {
        self == other
    }

    /// Borrowed view of the bits.
    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    /// Iterates the bits from index 0.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, bool>> {
        self.bits.iter().copied()
    }

    pub(crate) fn swap(&mut self, i: usize, j: usize) {
        self.bits.swap(i, j);
    }

    /// Lowercase hex of the byte-aligned prefix.
    pub fn to_hex(&self) -> String {
        self.to_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl From<Vec<bool>> for BitVector {
    fn from(bits: Vec<bool>) -> Self {
        Self { bits }
    }
}

impl FromIterator<bool> for BitVector {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl FromStr for BitVector {
    type Err = BitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bits(s)
    }
}

impl fmt::Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.bits {
            f.write_str(if b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl Serialize for BitVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BitVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        Self::from_bits(&literal).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitVector")
            .field("len", &self.len())
            .field("hex", &self.to_hex())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bv(s: &str) -> BitVector {
        BitVector::from_bits(s).unwrap()
    }

    #[test]
    fn test_from_bits_rejects_bad_characters() {
        assert!(BitVector::from_bits("00101101001").is_ok());
        assert!(matches!(
            BitVector::from_bits("00101?10101"),
            Err(BitsError::Format { found: '?', position: 5 })
        ));
        assert!(BitVector::from_bits("0 1 0 1").is_err());
        assert!(BitVector::from_bits("001101   ").is_err());
    }

    #[test]
    fn test_from_bytes_msb_first() {
        let bits = BitVector::from_bytes(&[41]);
        assert_eq!(bits.to_string(), "00101001");
        assert_eq!(BitVector::from_bytes(&[0xAB, 0x01]).len(), 16);
    }

    #[test]
    fn test_iter_cycles() {
        let wrapped: BitVector = bv("101").iter().cycle().take(7).collect();
        assert_eq!(wrapped.to_string(), "1011011");
    }

    #[test]
    fn test_to_int_scenario() {
        assert_eq!(bv("00100101").to_int().unwrap(), 37);
        assert_eq!(BitVector::new().to_int().unwrap(), 0);
    }

    #[test]
    fn test_to_int_overflow_policy() {
        let long = BitVector::zeros(65);
        assert_eq!(long.to_int(), Err(BitsError::Overflow(65)));

        let mut tail = BitVector::zeros(70);
        tail.invert(69).unwrap();
        assert_eq!(tail.low_u64(), 1);
    }

    #[test]
    fn test_from_int_width() {
        assert_eq!(BitVector::from_int(4, 5).unwrap().to_string(), "0101");
        assert_eq!(BitVector::from_int(3, 0xFF).unwrap().to_string(), "111");
        assert_eq!(
            BitVector::from_int(64, u64::MAX).unwrap().to_int().unwrap(),
            u64::MAX
        );
        assert_eq!(BitVector::from_int(65, 0), Err(BitsError::WidthTooLarge(65)));
    }

    #[test]
    fn test_at_and_invert_bounds() {
        let mut bits = bv("010");
        assert!(bits.at(1).unwrap());
        assert!(bits.at(3).is_err());

        bits.invert(0).unwrap();
        assert_eq!(bits.to_string(), "110");
        assert!(bits.invert(3).is_err());
    }

    #[test]
    fn test_substring_is_independent_copy() {
        let original = bv("10110");
        let mut slice = original.substring(1, 3).unwrap();
        slice.invert(0).unwrap();
        slice.add(true);

        assert_eq!(slice.to_string(), "1111");
        assert_eq!(original.to_string(), "10110");
    }

    #[test]
    fn test_substring_out_of_bounds() {
        let bits = bv("1011");
        assert!(bits.substring(2, 3).is_err());
        assert!(bits.first(5).is_err());
        assert_eq!(bits.first(4).unwrap(), bits);
        assert!(bits.substring(4, 0).unwrap().is_empty());
    }

    #[test]
    fn test_extend_leaves_operands_untouched() {
        let a = bv("10");
        let b = bv("011");
        let joined = a.extend(&b);

        assert_eq!(joined.to_string(), "10011");
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn test_partition_variants() {
        let bits = bv("1101001");
        let blocks = bits.partition(3);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].to_string(), "100");

        let extra = bits.partition_extra(3);
        assert_eq!(extra.len(), 3);
        assert_eq!(extra[2].to_string(), "1");

        assert!(bits.partition(0).is_empty());
        assert_eq!(bits.partition_extra(7).len(), 1);
    }

    #[test]
    fn test_counts() {
        let bits = bv("1101");
        assert_eq!(bits.ones(), 3);
        assert!((bits.proportion() - 0.75).abs() < 1e-12);
        assert!(bits.parity());
        assert_eq!(BitVector::new().proportion(), 0.0);
    }

    #[test]
    fn test_has_pattern_at() {
        let bits = bv("0010101100");
        let pattern = bv("101");
        assert!(bits.has_pattern_at(&pattern, 2));
        assert!(bits.has_pattern_at(&pattern, 4));
        assert!(!bits.has_pattern_at(&pattern, 3));
        assert!(!bits.has_pattern_at(&pattern, 9));
    }

    #[test]
    fn test_inner_product_uses_shorter_length() {
        assert_eq!(bv("1101").inner_product(&bv("10111")), 2);
        assert_eq!(bv("1").inner_product(&BitVector::new()), 0);
    }

    #[test]
    fn test_to_bytes_drops_partial_byte() {
        let bits = bv("0010100111");
        assert_eq!(bits.to_bytes(), vec![41]);
        assert_eq!(bits.to_hex(), "29");
    }

    #[test]
    fn test_all_of_length() {
        let all: Vec<String> = BitVector::all_of_length(2)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(all, vec!["00", "01", "10", "11"]);
    }

    #[test]
    fn test_serde_as_literal() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            bits: BitVector,
        }

        let text = toml::to_string(&Wrapper { bits: bv("0110") }).unwrap();
        assert!(text.contains("\"0110\""));
        assert_eq!(toml::from_str::<Wrapper>(&text).unwrap().bits, bv("0110"));
        assert!(toml::from_str::<Wrapper>("bits = \"01x\"").is_err());
    }

    #[test]
    fn test_equality_respects_length() {
        assert!(bv("01").equals(&bv("01")));
        assert!(!bv("01").equals(&bv("001")));
    }
}
