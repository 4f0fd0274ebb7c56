//! Entropy sources.
//!
//! Anything that can hand out a requested number of bits implements
//! [`EntropySource`]. The protocol consumes sources polymorphically and
//! never cares which implementation backs them:
//!
//! - [`ProcessSource`]: stdout of an external binary (webcam, audio, ...)
//! - [`InnerProductExtractor`]: combines two weak sources
//! - [`RandomWalkExtractor`]: walks a lazily built graph with a strong source
//! - [`PseudoRandomExtractor`]: seeded linear congruential generator
//! - [`ChaChaSource`]: ChaCha20 CSPRNG, reseedable from other sources
//!
//! [`Generator`] layers typed draws (booleans, integers, floats) on top of
//! any source. Sources are wired together by value through [`SourceConfig`]
//! and injected into a session, never looked up globally.

mod csprng;
mod generator;
mod inner_product;
mod prng;
mod process;
mod random_walk;

pub use csprng::ChaChaSource;
pub use generator::Generator;
pub use inner_product::InnerProductExtractor;
pub use prng::PseudoRandomExtractor;
pub use process::ProcessSource;
pub use random_walk::RandomWalkExtractor;

use crate::bits::{BitVector, BitsError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by entropy sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("entropy source binary not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to run entropy source {}: {reason}", .path.display())]
    Spawn { path: PathBuf, reason: String },

    #[error("entropy source {} exited unsuccessfully: {status}", .path.display())]
    ProcessFailed { path: PathBuf, status: String },

    #[error("entropy source {} produced no output", .0.display())]
    EmptyOutput(PathBuf),

    #[error("insufficient entropy: got {got} bits, need {need} bits")]
    InsufficientEntropy { got: usize, need: usize },

    #[error("invalid source parameter: {0}")]
    InvalidParameter(String),

    #[error("bit vector error: {0}")]
    Bits(#[from] BitsError),
}

/// A source of (possibly weak) random bits.
pub trait EntropySource {
    /// Returns exactly `n` bits.
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError>;
}

impl<S: EntropySource + ?Sized> EntropySource for Box<S> {
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
        (**self).get_bits(n)
    }
}

impl<S: EntropySource + ?Sized> EntropySource for &mut S {
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
        (**self).get_bits(n)
    }
}

/// A type-erased source that can move to a peer's thread.
pub type BoxedSource = Box<dyn EntropySource + Send>;

fn default_block_count() -> usize {
    8
}

fn default_degree() -> usize {
    8
}

/// Declarative description of a source and its inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Output of an external binary.
    Process {
        /// Path to the binary.
        path: PathBuf,
    },
    /// Linear congruential generator.
    Prng {
        /// Generator seed.
        seed: u64,
    },
    /// ChaCha20 CSPRNG; OS-seeded when no seed is given.
    Chacha {
        /// Optional fixed seed.
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Inner product of two sources.
    InnerProduct {
        /// First input.
        first: Box<SourceConfig>,
        /// Second input.
        second: Box<SourceConfig>,
        /// Number of blocks summed per output.
        #[serde(default = "default_block_count")]
        block_count: usize,
    },
    /// Random walk over a graph generated by a weak source.
    RandomWalk {
        /// Fast, weak input.
        weak: Box<SourceConfig>,
        /// Slow, strong input.
        strong: Box<SourceConfig>,
        /// Neighbours per node; a power of two.
        #[serde(default = "default_degree")]
        degree: usize,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Chacha { seed: None }
    }
}

impl SourceConfig {
    /// Instantiates the described source.
    pub fn build(&self) -> Result<BoxedSource, SourceError> {
        let source: BoxedSource = match self {
            Self::Process { path } => Box::new(ProcessSource::new(path)?),
            Self::Prng { seed } => Box::new(PseudoRandomExtractor::new(*seed)),
            Self::Chacha { seed: Some(seed) } => Box::new(ChaChaSource::from_u64_seed(*seed)),
            Self::Chacha { seed: None } => Box::new(ChaChaSource::from_os_entropy()),
            Self::InnerProduct {
                first,
                second,
                block_count,
            } => Box::new(InnerProductExtractor::with_block_count(
                first.build()?,
                second.build()?,
                *block_count,
            )?),
            Self::RandomWalk {
                weak,
                strong,
                degree,
            } => Box::new(RandomWalkExtractor::with_degree(
                weak.build()?,
                strong.build()?,
                *degree,
            )?),
        };
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_nested_config() {
        let config = SourceConfig::InnerProduct {
            first: Box::new(SourceConfig::Prng { seed: 1 }),
            second: Box::new(SourceConfig::Chacha { seed: Some(2) }),
            block_count: 4,
        };
        let mut source = config.build().unwrap();
        assert_eq!(source.get_bits(100).unwrap().len(), 100);
    }

    #[test]
    fn test_missing_process_fails_fast() {
        let config = SourceConfig::Process {
            path: PathBuf::from("/nonexistent/entropy-binary"),
        };
        assert!(matches!(config.build(), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_config_from_toml() {
        let config: SourceConfig = toml::from_str(
            r#"
            kind = "random_walk"
            weak = { kind = "prng", seed = 5 }
            strong = { kind = "chacha", seed = 6 }
            "#,
        )
        .unwrap();
        assert!(matches!(
            config,
            SourceConfig::RandomWalk { degree: 8, .. }
        ));
        assert_eq!(config.build().unwrap().get_bits(32).unwrap().len(), 32);
    }
}
