//! Two-party secret reconciliation ("privacy amplification").
//!
//! The initiator sends a fresh secret over the noisy private link and
//! publishes a universal hash of it over the perfect public link. The
//! responder checks the hash against what it received and, on mismatch,
//! first tries single-bit corrections and then Cascade-style parity
//! rounds until both sides hold the same, shorter secret.
//!
//! ```text
//! Init → Transmit → Verify ─┬─────────────────────────────→ Accepted → Done
//!                           ├→ BitTwiddle ─────────────────→ Accepted
//!                           └→ ReconcileRound(n) → Verify ─┘
//! ```
//!
//! Channel corruption is the expected input here, not an error. Errors are
//! reserved for broken links, bad configuration, exhausted round budgets
//! and aborts.

mod cascade;
mod config;
mod session;
mod shuffle;
mod verify;

pub use cascade::{reconcile, ReconcileOutcome};
pub use config::{SessionConfig, SessionConfigError};
pub use session::{
    run_session, AbortSignal, Initiator, Responder, SessionOutcome, SessionReport, SessionState,
};
pub use shuffle::shuffle;
pub use verify::{hash, UniversalHash};

use crate::bits::BitsError;
use crate::channel::ChannelError;
use crate::source::SourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which side of the protocol a peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Generates the secret and drives parity exchange.
    Initiator,
    /// Receives the secret and answers parity checks.
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        })
    }
}

/// Errors that end a protocol run.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("bit vector error: {0}")]
    Bits(#[from] BitsError),

    #[error("entropy source error: {0}")]
    Source(#[from] SourceError),

    #[error("invalid session configuration: {0}")]
    Config(#[from] SessionConfigError),

    #[error("reconciliation exhausted after {rounds} rounds with {len} bits left")]
    ReconciliationExhausted { rounds: u32, len: usize },

    #[error("session aborted")]
    Aborted,

    #[error("{0} peer panicked")]
    PeerPanicked(Role),

    #[error("failed to spawn peer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ProtocolError {
    /// True if this error only reports that the other peer went away.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ProtocolError::Channel(ChannelError::Disconnected))
    }
}
