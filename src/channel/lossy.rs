//! Noisy link that corrupts message content but never drops a message.

use super::{Channel, ChannelError, Endpoint, LinkConfig, LinkStats};
use crate::bits::BitVector;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Private channel endpoint that flips each transmitted bit with
/// probability `p` before delivery.
///
/// Corruption is applied to a copy of the payload on the sending side;
/// the sender's own value is never touched.
pub struct LossyLink {
    endpoint: Endpoint,
    error_rate: f64,
    rng: ChaCha8Rng,
}

impl LossyLink {
    /// Creates a connected pair from the given configuration.
    ///
    /// With a configured seed both endpoints are deterministic; otherwise
    /// each corruption RNG is seeded from OS entropy.
    pub fn pair(config: &LinkConfig) -> Result<(Self, Self), ChannelError> {
        config.validate()?;
        let (a, b) = Endpoint::pair(config.receive_timeout());

        let (rng_a, rng_b) = match config.seed {
            Some(seed) => (
                ChaCha8Rng::seed_from_u64(seed),
                ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (ChaCha8Rng::from_entropy(), ChaCha8Rng::from_entropy()),
        };

        Ok((
            Self {
                endpoint: a,
                error_rate: config.error_rate,
                rng: rng_a,
            },
            Self {
                endpoint: b,
                error_rate: config.error_rate,
                rng: rng_b,
            },
        ))
    }

    /// The per-bit flip probability.
    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    /// Traffic counters for this endpoint.
    pub fn stats(&self) -> LinkStats {
        self.endpoint.stats()
    }

    fn corrupt(&mut self, message: &BitVector) -> (BitVector, u64) {
        let mut flipped = 0;
        let corrupted = message
            .iter()
            .map(|bit| {
                if self.rng.gen_bool(self.error_rate) {
                    flipped += 1;
                    !bit
                } else {
                    bit
                }
            })
            .collect();
        (corrupted, flipped)
    }
}

impl Channel for LossyLink {
    fn send(&mut self, message: BitVector) -> Result<(), ChannelError> {
        let (corrupted, flipped) = self.corrupt(&message);
        tracing::debug!(
            bits = corrupted.len(),
            flipped,
            error_rate = self.error_rate,
            "lossy link send"
        );
        self.endpoint.send(corrupted)?;
        self.endpoint.stats_mut().bits_flipped += flipped;
        Ok(())
    }

    fn receive(&mut self) -> Result<BitVector, ChannelError> {
        self.endpoint.receive()
    }
}
