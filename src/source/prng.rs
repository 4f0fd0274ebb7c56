//! Seeded linear congruential extractor.

use super::{EntropySource, SourceError};
use crate::bits::BitVector;

const MULTIPLIER: u64 = 0x5DEECE66D;
const INCREMENT: u64 = 0xB;
const MASK: u64 = (1 << 48) - 1;

/// 48-bit linear congruential generator.
///
/// Deterministic for a given seed, which is what the protocol relies on when
/// both peers derive the same permutation from a public value. Not suitable
/// as a secret source.
#[derive(Debug, Clone)]
pub struct PseudoRandomExtractor {
    state: u64,
}

impl PseudoRandomExtractor {
    /// Creates a generator from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            state: (seed ^ MULTIPLIER) & MASK,
        }
    }

    /// Advances the state and returns its top `bits` bits (at most 32).
    fn next_bits(&mut self, bits: usize) -> u64 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT)
            & MASK;
        self.state >> (48 - bits)
    }
}

impl EntropySource for PseudoRandomExtractor {
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
        let mut result = BitVector::new();
        let mut produced = 0;
        while produced < n {
            let chunk = (n - produced).min(32);
            let value = self.next_bits(chunk);
            result = result.extend(&BitVector::from_u64(chunk, value));
            produced += chunk;
        }
        Ok(result)
    }
}
