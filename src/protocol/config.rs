//! Session parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected session parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionConfigError {
    #[error("secret_len must be positive")]
    EmptySecret,

    #[error("base_block_size must be at least 2, got {0}")]
    BlockTooSmall(usize),

    #[error("max_rounds must be positive")]
    NoRounds,

    #[error("min_secret_len {min} exceeds secret_len {secret_len}")]
    MinAboveSecret { min: usize, secret_len: usize },
}

/// Parameters shared by both peers. Both must use identical values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bits drawn for the raw secret.
    pub secret_len: usize,
    /// Block size of round 1; round `n` uses `n * base_block_size`,
    /// capped so the candidate always splits into at least two blocks.
    pub base_block_size: usize,
    /// Single-bit corrections tried before reconciliation.
    pub twiddle_attempts: usize,
    /// Rounds allowed before giving up.
    pub max_rounds: u32,
    /// Shortest candidate worth verifying.
    pub min_secret_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_len: 512,
            base_block_size: 16,
            twiddle_attempts: 100,
            max_rounds: 256,
            min_secret_len: 16,
        }
    }
}

impl SessionConfig {
    /// Block size used in `round` (starting at 1) for a `len`-bit candidate.
    ///
    /// Grows linearly with the round but never exceeds half the candidate;
    /// a single block would hide every even number of remaining errors.
    pub fn block_size(&self, round: u32, len: usize) -> usize {
        self.base_block_size
            .saturating_mul(round as usize)
            .min(len.div_ceil(2))
            .max(2)
    }

    /// Checks the parameters for consistency.
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if self.secret_len == 0 {
            return Err(SessionConfigError::EmptySecret);
        }
        if self.base_block_size < 2 {
            return Err(SessionConfigError::BlockTooSmall(self.base_block_size));
        }
        if self.max_rounds == 0 {
            return Err(SessionConfigError::NoRounds);
        }
        if self.min_secret_len > self.secret_len {
            return Err(SessionConfigError::MinAboveSecret {
                min: self.min_secret_len,
                secret_len: self.secret_len,
            });
        }
        Ok(())
    }
}
