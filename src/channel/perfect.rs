//! Lossless, order-preserving link.

use super::{Channel, ChannelError, Endpoint, LinkStats};
use crate::bits::BitVector;
use std::time::Duration;

/// Public channel endpoint that delivers every message unchanged.
///
/// Carries all public protocol traffic: pads, hashes, parities and
/// accept/reject signals.
pub struct PerfectLink {
    endpoint: Endpoint,
}

impl PerfectLink {
    /// Creates a connected pair of endpoints that block indefinitely.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_timeout(None)
    }

    /// Creates a connected pair whose receives give up after `timeout`.
    pub fn pair_with_timeout(timeout: Option<Duration>) -> (Self, Self) {
        let (a, b) = Endpoint::pair(timeout);
        (Self { endpoint: a }, Self { endpoint: b })
    }

    /// Traffic counters for this endpoint.
    pub fn stats(&self) -> LinkStats {
        self.endpoint.stats()
    }
}

impl Channel for PerfectLink {
    fn send(&mut self, message: BitVector) -> Result<(), ChannelError> {
        tracing::trace!(bits = message.len(), "perfect link send");
        self.endpoint.send(message)
    }

    fn receive(&mut self) -> Result<BitVector, ChannelError> {
        self.endpoint.receive()
    }
}
