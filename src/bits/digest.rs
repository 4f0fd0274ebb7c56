//! Content fingerprints for bit vectors.
//!
//! Digests are map keys for memoizing derived structures (the random-walk
//! graph). They are not commitments.

use super::vector::BitVector;
use sha2::{Digest, Sha256};

/// Hash function used to fingerprint a vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256, the default.
    #[default]
    Sha256,
    /// BLAKE3.
    Blake3,
}

impl BitVector {
    /// Hex fingerprint of the vector's content using SHA-256.
    pub fn digest(&self) -> String {
        self.digest_with(HashAlgorithm::default())
    }

    /// Hex fingerprint using the chosen algorithm.
    ///
    /// The vector is cut into 64-bit limbs from the front (the last limb may
    /// be shorter), each limb is rendered in decimal, and the concatenated
    /// text is hashed.
    pub fn digest_with(&self, algorithm: HashAlgorithm) -> String {
        let text: String = self
            .partition_extra(64)
            .iter()
            .map(|limb| limb.low_u64().to_string())
            .collect();

        let bytes: Vec<u8> = match algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(text.as_bytes()).to_vec(),
            HashAlgorithm::Blake3 => blake3::hash(text.as_bytes()).as_bytes().to_vec(),
        };

        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
