//! ChaCha-based CSPRNG source with reseeding support.
//!
//! Used as the default secret and pad source. Physical sources can be
//! mixed in through [`ChaChaSource::reseed`] or
//! [`ChaChaSource::reseed_from`] to supplement, not replace, the initial
//! OS seed.
//!
//! # Reseeding Model
//!
//! The new seed is `BLAKE3(domain || counter || bit_len || old_seed || entropy)`.
//! Entropy is zero-padded to whole bytes; `bit_len` keeps padded and
//! unpadded inputs apart.

use super::{EntropySource, SourceError};
use crate::bits::BitVector;
use blake3::Hasher;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Domain separator for reseeding operations.
const RESEED_DOMAIN: &[u8] = b"privacy-amplification-reseed-v1";

/// A reseedable CSPRNG backed by ChaCha20.
pub struct ChaChaSource {
    inner: ChaCha20Rng,
    /// Last seed handed to ChaCha, mixed into the next reseed.
    seed_material: [u8; 32],
    min_entropy_bits: usize,
    reseed_count: u64,
    bytes_since_reseed: u64,
}

impl ChaChaSource {
    /// Creates a source seeded from the OS entropy pool.
    pub fn from_os_entropy() -> Self {
        let mut seed_material = [0u8; 32];
        rand_core::OsRng.fill_bytes(&mut seed_material);
        Self::from_seed(seed_material)
    }

    /// Creates a deterministic source from explicit seed material.
    pub fn from_seed(seed_material: [u8; 32]) -> Self {
        Self {
            inner: ChaCha20Rng::from_seed(seed_material),
            seed_material,
            min_entropy_bits: 128,
            reseed_count: 0,
            bytes_since_reseed: 0,
        }
    }

    /// Creates a deterministic source from a 64-bit seed.
    pub fn from_u64_seed(seed: u64) -> Self {
        let mut seed_material = [0u8; 32];
        ChaCha20Rng::seed_from_u64(seed).fill_bytes(&mut seed_material);
        Self::from_seed(seed_material)
    }

    /// Sets the minimum number of bits accepted by a reseed.
    pub fn with_min_entropy(mut self, min_entropy_bits: usize) -> Self {
        self.min_entropy_bits = min_entropy_bits;
        self
    }

    /// Mixes `entropy` into the generator state.
    pub fn reseed(&mut self, entropy: &BitVector) -> Result<(), SourceError> {
        if entropy.len() < self.min_entropy_bits {
            return Err(SourceError::InsufficientEntropy {
                got: entropy.len(),
                need: self.min_entropy_bits,
            });
        }

        // Pad to whole bytes so trailing bits still contribute.
        let padding = BitVector::zeros((8 - entropy.len() % 8) % 8);
        let bytes = entropy.extend(&padding).to_bytes();

        let mut hasher = Hasher::new();
        hasher.update(RESEED_DOMAIN);
        hasher.update(&self.reseed_count.to_le_bytes());
        hasher.update(&(entropy.len() as u64).to_le_bytes());
        hasher.update(&self.seed_material);
        hasher.update(&bytes);

        let new_seed_material: [u8; 32] = *hasher.finalize().as_bytes();

        self.seed_material = new_seed_material;
        self.inner = ChaCha20Rng::from_seed(new_seed_material);
        self.reseed_count += 1;
        self.bytes_since_reseed = 0;

        tracing::info!(
            reseed_count = self.reseed_count,
            entropy_bits = entropy.len(),
            "CSPRNG reseeded via BLAKE3 mixing"
        );

        Ok(())
    }

    /// Draws `bits` from another source and reseeds with them.
    pub fn reseed_from<S: EntropySource + ?Sized>(
        &mut self,
        source: &mut S,
        bits: usize,
    ) -> Result<(), SourceError> {
        let entropy = source.get_bits(bits)?;
        self.reseed(&entropy)
    }

    /// Returns the number of reseeds performed.
    pub fn reseed_count(&self) -> u64 {
        self.reseed_count
    }

    /// Returns bytes generated since last reseed.
    pub fn bytes_since_reseed(&self) -> u64 {
        self.bytes_since_reseed
    }
}

impl EntropySource for ChaChaSource {
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
        let mut bytes = vec![0u8; n.div_ceil(8)];
        self.fill_bytes(&mut bytes);
        Ok(BitVector::from_bytes(&bytes).first(n)?)
    }
}

impl RngCore for ChaChaSource {
    fn next_u32(&mut self) -> u32 {
        self.bytes_since_reseed += 4;
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.bytes_since_reseed += 8;
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.bytes_since_reseed += dest.len() as u64;
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.bytes_since_reseed += dest.len() as u64;
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PseudoRandomExtractor;

    #[test]
    fn test_reseed_increments_count() {
        let mut rng = ChaChaSource::from_u64_seed(1).with_min_entropy(64);
        assert_eq!(rng.reseed_count(), 0);

        rng.reseed(&BitVector::from_bytes(&[0x42; 16])).unwrap();
        assert_eq!(rng.reseed_count(), 1);
        assert_eq!(rng.bytes_since_reseed(), 0);
    }

    #[test]
    fn test_insufficient_entropy_rejected() {
        let mut rng = ChaChaSource::from_u64_seed(1).with_min_entropy(256);
        let result = rng.reseed(&BitVector::from_bytes(&[0x42; 16]));

        assert!(matches!(
            result,
            Err(SourceError::InsufficientEntropy { got: 128, need: 256 })
        ));
    }

    #[test]
    fn test_bits_and_byte_accounting() {
        let mut rng = ChaChaSource::from_u64_seed(2);
        assert_eq!(rng.get_bits(100).unwrap().len(), 100);
        assert_eq!(rng.bytes_since_reseed(), 13);
    }

    #[test]
    fn test_seeded_sources_agree_until_reseed() {
        let mut a = ChaChaSource::from_u64_seed(3);
        let mut b = ChaChaSource::from_u64_seed(3);
        assert_eq!(a.get_bits(256).unwrap(), b.get_bits(256).unwrap());

        a.reseed_from(&mut PseudoRandomExtractor::new(9), 128).unwrap();
        assert_ne!(a.get_bits(256).unwrap(), b.get_bits(256).unwrap());
    }

    #[test]
    fn test_reseed_counter_affects_output() {
        let entropy = BitVector::from_bytes(&[0xAA; 32]);
        let dummy = BitVector::from_bytes(&[0x00; 32]);

        let mut a = ChaChaSource::from_u64_seed(4);
        let mut b = ChaChaSource::from_u64_seed(4);
        a.reseed(&entropy).unwrap();
        b.reseed(&dummy).unwrap();
        b.reseed(&entropy).unwrap();

        assert_ne!(a.get_bits(256).unwrap(), b.get_bits(256).unwrap());
    }

    #[test]
    fn test_os_seeded_sources_differ() {
        let mut a = ChaChaSource::from_os_entropy();
        let mut b = ChaChaSource::from_os_entropy();
        assert_ne!(a.get_bits(256).unwrap(), b.get_bits(256).unwrap());
    }
}
