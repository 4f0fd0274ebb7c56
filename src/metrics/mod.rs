//! Prometheus metrics for reconciliation sessions.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `privacy_amp_sessions_total` - Sessions run
//! - `privacy_amp_sessions_accepted_total` - Sessions ending in agreement
//! - `privacy_amp_sessions_exhausted_total` - Sessions that ran out of rounds
//!
//! ## Reconciliation Cost
//! - `privacy_amp_reconcile_rounds_total` - Bisection rounds executed
//! - `privacy_amp_twiddle_corrections_total` - Single-bit corrections
//! - `privacy_amp_parity_bits_revealed_total` - Parity bits made public
//! - `privacy_amp_public_bits_total` - Bits carried by the public link
//! - `privacy_amp_secret_bits` - Length of the last agreed secret
//!
//! ## Source Health
//! - `privacy_amp_source_health_status` - 1 if the qualified source is healthy
//! - `privacy_amp_source_samples` - Samples analyzed during qualification
//!
//! # Example
//!
//! ```no_run
//! use privacy_amplification::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.record(&MetricsSnapshot {
//!     accepted: true,
//!     rounds: 2,
//!     secret_bits: 430,
//!     ..Default::default()
//! });
//! println!("{}", registry.encode().expect("Failed to encode"));
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
