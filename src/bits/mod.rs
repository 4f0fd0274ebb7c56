//! Arbitrary-length bit vectors.
//!
//! [`BitVector`] is the value type every other module exchanges: secrets,
//! pads, hashes, parities and protocol signals are all bit vectors. It
//! provides slicing (always by copy), partitioning, counting, fixed-width
//! modular arithmetic, numeric comparison and a content digest.

mod arith;
mod digest;
mod vector;

pub use digest::HashAlgorithm;
pub use vector::{BitVector, BitsError};
