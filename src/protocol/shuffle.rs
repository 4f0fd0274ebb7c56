//! Public, seeded permutation of a secret candidate.

use crate::bits::BitVector;
use crate::source::{Generator, PseudoRandomExtractor, SourceError};

/// Permutes `bits` in place with a Fisher-Yates shuffle driven by a
/// generator seeded with `seed`.
///
/// Both peers call this with the same public seed, so their candidates are
/// permuted identically and clustered errors spread across blocks.
pub fn shuffle(bits: &mut BitVector, seed: u64) -> Result<(), SourceError> {
    let len = bits.len();
    if len < 2 {
        return Ok(());
    }

    let mut rng = Generator::new(PseudoRandomExtractor::new(seed));
    for i in 0..len - 1 {
        let j = rng.next_int_between(i as u64, len as u64)? as usize;
        bits.swap(i, j);
    }
    Ok(())
}
