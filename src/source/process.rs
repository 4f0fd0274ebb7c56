//! Entropy read from an external process.

use super::{EntropySource, SourceError};
use crate::bits::BitVector;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Runs an external binary and buffers its stdout as raw entropy.
///
/// The binary is re-run whenever the buffer cannot satisfy a request.
/// Hardware capture helpers (webcam, microphone) are wired in this way.
#[derive(Debug)]
pub struct ProcessSource {
    path: PathBuf,
    buffer: VecDeque<u8>,
}

impl ProcessSource {
    /// Creates a source for the binary at `path`.
    ///
    /// Fails immediately if the binary does not exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SourceError::NotFound(path));
        }
        Ok(Self {
            path,
            buffer: VecDeque::new(),
        })
    }

    /// Path of the backing binary.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refill(&mut self) -> Result<(), SourceError> {
        let output = Command::new(&self.path)
            .output()
            .map_err(|e| SourceError::Spawn {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(SourceError::ProcessFailed {
                path: self.path.clone(),
                status: output.status.to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(SourceError::EmptyOutput(self.path.clone()));
        }

        tracing::trace!(
            path = %self.path.display(),
            bytes = output.stdout.len(),
            "refilled process buffer"
        );
        self.buffer.extend(output.stdout);
        Ok(())
    }
}

impl EntropySource for ProcessSource {
    fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
        if n == 0 {
            return Err(SourceError::InvalidParameter(
                "process sources cannot serve zero bits".to_string(),
            ));
        }
        let needed = n.div_ceil(8);
        while self.buffer.len() < needed {
            self.refill()?;
        }

        let bytes: Vec<u8> = self.buffer.drain(..needed).collect();
        Ok(BitVector::from_bytes(&bytes).first(n)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        assert!(matches!(
            ProcessSource::new("/definitely/not/here"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_reads_stdout_across_runs() {
        // `echo` with no arguments prints a single newline per run.
        let mut source = ProcessSource::new("/bin/echo").unwrap();
        let bits = source.get_bits(20).unwrap();
        assert_eq!(bits.len(), 20);
        assert_eq!(bits.first(16).unwrap(), BitVector::from_bytes(b"\n\n"));
    }

    #[test]
    fn test_zero_bits_rejected() {
        let mut source = ProcessSource::new("/bin/echo").unwrap();
        assert!(matches!(
            source.get_bits(0),
            Err(SourceError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_failing_binary() {
        let mut source = ProcessSource::new("/bin/false").unwrap();
        assert!(matches!(
            source.get_bits(8),
            Err(SourceError::ProcessFailed { .. })
        ));
    }

    #[test]
    fn test_silent_binary() {
        let mut source = ProcessSource::new("/bin/true").unwrap();
        assert!(matches!(
            source.get_bits(8),
            Err(SourceError::EmptyOutput(_))
        ));
    }
}
