//! Blocking message conduits between exactly two peers.
//!
//! Both link types are synchronous rendezvous channels: `send` blocks until
//! the peer's `receive` takes the message, so every link is strictly FIFO
//! and never drops or reorders a message. [`PerfectLink`] delivers content
//! unchanged; [`LossyLink`] flips each bit independently with a fixed
//! probability before delivery.
//!
//! Links are created as connected endpoint pairs, one endpoint per peer.
//! Dropping an endpoint disconnects the pair, which is how a failed or
//! aborted peer unblocks its partner.

mod lossy;
mod perfect;

pub use lossy::LossyLink;
pub use perfect::PerfectLink;

use crate::bits::BitVector;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by channel endpoints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("peer endpoint disconnected")]
    Disconnected,

    #[error("no message received within {0:?}")]
    Timeout(Duration),

    #[error("expected a {expected}-bit message, got {got} bits")]
    UnexpectedLength { expected: usize, got: usize },

    #[error("invalid error rate {0} (must be within 0.0..=1.0)")]
    InvalidErrorRate(f64),
}

/// Shared capability of both link variants.
pub trait Channel {
    /// Sends a message, blocking until the peer receives it.
    fn send(&mut self, message: BitVector) -> Result<(), ChannelError>;

    /// Blocks until the peer sends a message.
    fn receive(&mut self) -> Result<BitVector, ChannelError>;

    /// Sends a single-bit signal.
    fn send_bit(&mut self, bit: bool) -> Result<(), ChannelError> {
        self.send(std::iter::once(bit).collect())
    }

    /// Receives a single-bit signal.
    fn receive_bit(&mut self) -> Result<bool, ChannelError> {
        let message = self.receive()?;
        match message.as_slice() {
            [bit] => Ok(*bit),
            _ => Err(ChannelError::UnexpectedLength {
                expected: 1,
                got: message.len(),
            }),
        }
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send(&mut self, message: BitVector) -> Result<(), ChannelError> {
        (**self).send(message)
    }

    fn receive(&mut self) -> Result<BitVector, ChannelError> {
        (**self).receive()
    }
}

/// Traffic counters for one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Messages sent by this endpoint.
    pub messages_sent: u64,
    /// Bits sent by this endpoint.
    pub bits_sent: u64,
    /// Messages received by this endpoint.
    pub messages_received: u64,
    /// Bits corrupted before delivery (lossy links only).
    pub bits_flipped: u64,
}

/// Configuration for a noisy link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Independent per-bit flip probability.
    pub error_rate: f64,
    /// Seed for the corruption RNG; OS entropy when absent.
    pub seed: Option<u64>,
    /// Receive timeout in milliseconds; blocks forever when absent.
    pub receive_timeout_ms: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            error_rate: 0.1,
            seed: None,
            receive_timeout_ms: None,
        }
    }
}

impl LinkConfig {
    /// Creates a configuration with a fixed error rate and seed.
    pub fn seeded(error_rate: f64, seed: u64) -> Self {
        Self {
            error_rate,
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ChannelError> {
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(ChannelError::InvalidErrorRate(self.error_rate));
        }
        Ok(())
    }

    /// Receive timeout as a duration.
    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_ms.map(Duration::from_millis)
    }
}

/// One side of a rendezvous pair.
pub(crate) struct Endpoint {
    tx: SyncSender<BitVector>,
    rx: Receiver<BitVector>,
    timeout: Option<Duration>,
    stats: LinkStats,
}

impl Endpoint {
    pub(crate) fn pair(timeout: Option<Duration>) -> (Self, Self) {
        // Zero capacity: a send completes only when the peer receives.
        let (tx_ab, rx_ab) = mpsc::sync_channel(0);
        let (tx_ba, rx_ba) = mpsc::sync_channel(0);
        (
            Self {
                tx: tx_ab,
                rx: rx_ba,
                timeout,
                stats: LinkStats::default(),
            },
            Self {
                tx: tx_ba,
                rx: rx_ab,
                timeout,
                stats: LinkStats::default(),
            },
        )
    }

    pub(crate) fn send(&mut self, message: BitVector) -> Result<(), ChannelError> {
        let bits = message.len() as u64;
        self.tx
            .send(message)
            .map_err(|_| ChannelError::Disconnected)?;
        self.stats.messages_sent += 1;
        self.stats.bits_sent += bits;
        Ok(())
    }

    pub(crate) fn receive(&mut self) -> Result<BitVector, ChannelError> {
        let message = match self.timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => ChannelError::Timeout(timeout),
                RecvTimeoutError::Disconnected => ChannelError::Disconnected,
            })?,
            None => self.rx.recv().map_err(|_| ChannelError::Disconnected)?,
        };
        self.stats.messages_received += 1;
        Ok(message)
    }

    pub(crate) fn stats(&self) -> LinkStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut LinkStats {
        &mut self.stats
    }
}
