//! Privacy Amplification Library
//!
//! Two peers agree on a shared secret that was sent over a noisy private
//! channel, talking only over a perfect public channel. Weak physical or
//! pseudo-random sources supply the raw bits.
//!
//! # Architecture
//!
//! ```text
//! source ──→ Initiator ──(LossyLink: secret)──→ Responder
//!               │  ⇅ PerfectLink: pads, hashes, parities ⇅ │
//!               └──── verify → bit-twiddle → Cascade rounds ┘
//!
//! analysis (battery + health monitor) qualifies sources up front
//! ```
//!
//! # Design Principles
//!
//! - **Corruption is input, not failure**: the protocol exists to repair it
//! - **Bounded**: reconciliation stops after a configured number of rounds
//! - **No shared state**: peers run on separate threads and only exchange
//!   messages
//! - **No cryptographic claims**: the hash detects disagreement, not
//!   tampering; the battery is a sanity check, not a proof of entropy
//!
//! # Example
//!
//! ```no_run
//! use privacy_amplification::{
//!     channel::LinkConfig,
//!     protocol::{run_session, AbortSignal, SessionConfig},
//!     source::ChaChaSource,
//! };
//!
//! let outcome = run_session(
//!     &SessionConfig::default(),
//!     &LinkConfig::default(),
//!     ChaChaSource::from_os_entropy(),
//!     ChaChaSource::from_os_entropy(),
//!     &AbortSignal::new(),
//! )
//! .unwrap();
//!
//! assert!(outcome.agreed());
//! println!("{}", outcome.initiator.secret.to_hex());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod bits;
pub mod channel;
pub mod config;
pub mod metrics;
pub mod protocol;
pub mod source;

// Re-export commonly used types at crate root
pub use analysis::{check_random, HealthMonitor, QualityThresholds};
pub use bits::{BitVector, BitsError};
pub use channel::{Channel, ChannelError, LinkConfig, LossyLink, PerfectLink};
pub use config::FileConfig;
pub use protocol::{
    run_session, AbortSignal, ProtocolError, Role, SessionConfig, SessionOutcome, SessionReport,
};
pub use source::{EntropySource, SourceConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
