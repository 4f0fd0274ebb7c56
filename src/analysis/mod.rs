//! Statistical qualification of entropy sources.
//!
//! [`check_random`] runs a NIST SP 800-22 subset over a sample.
//! [`HealthMonitor`] turns a stream of battery reports into a fail-closed
//! trust decision against [`QualityThresholds`]. These are sanity checks,
//! not proofs of entropy.

mod battery;
mod health;
mod special;
mod threshold;

pub use battery::{
    approximate_entropy, block_frequency, check_random, cumulative_sums, frequency, longest_run,
    non_overlapping_template, runs, serial, BatteryReport, TestResult, MIN_SAMPLE_BITS,
    SIGNIFICANCE,
};
pub use health::{HealthMetrics, HealthMonitor};
pub use special::{erfc, igamc, ln_gamma, std_normal};
pub use threshold::{QualityThresholds, ThresholdViolation};

use crate::bits::BitsError;
use crate::source::SourceError;
use thiserror::Error;

/// Errors raised while analysing a sample.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("sample too short: got {got} bits, need at least {need}")]
    SampleTooShort { got: usize, need: usize },

    #[error("bit vector error: {0}")]
    Bits(#[from] BitsError),

    #[error("failed to draw sample: {0}")]
    Source(#[from] SourceError),
}
