//! Two-source inner product extractor.

use super::{EntropySource, SourceError};
use crate::bits::BitVector;

/// Combines two independent weak sources.
///
/// Each call draws `block_count` blocks of `n` bits from both inputs and
/// returns `sum(a_i * b_i) mod 2^n`.
pub struct InnerProductExtractor<A, B> {
    first: A,
    second: B,
    block_count: usize,
}

impl<A: EntropySource, B: EntropySource> InnerProductExtractor<A, B> {
    /// Creates an extractor summing 8 blocks per output.
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            block_count: 8,
        }
    }

    /// Creates an extractor with a custom number of blocks.
    pub fn with_block_count(first: A, second: B, block_count: usize) -> Result<Self, SourceError> {
        if block_count == 0 {
            return Err(SourceError::InvalidParameter(
                "inner product block count must be positive".into(),
            ));
        }
        Ok(Self {
            first,
            second,
            block_count,
        })
    }
}

impl<A: EntropySource, B: EntropySource> EntropySource for InnerProductExtractor<A, B> {
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
        if n == 0 {
            return Ok(BitVector::new());
        }

        let left = self.first.get_bits(self.block_count * n)?.partition(n);
        let right = self.second.get_bits(self.block_count * n)?.partition(n);

        left.iter()
            .zip(&right)
            .try_fold(BitVector::zeros(n), |acc, (a, b)| {
                Ok(acc.binary_add(&a.binary_mul(b)?)?)
            })
    }
}
