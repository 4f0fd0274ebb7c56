//! Quality thresholds for fail-closed behavior.
//!
//! Decide whether a battery report is good enough for a source to be
//! trusted with secret or pad generation.

use super::BatteryReport;
use serde::{Deserialize, Serialize};

/// Acceptance criteria for one battery report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Maximum number of tests allowed to fail.
    pub max_failed_tests: usize,
    /// Minimum sample length in bits.
    pub min_sample_bits: usize,
    /// Any p-value below this fails the sample outright.
    pub critical_p_value: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_failed_tests: 1,
            min_sample_bits: 1024,
            critical_p_value: 1e-4,
        }
    }
}

impl QualityThresholds {
    /// Stricter thresholds: no failures, larger samples.
    pub fn conservative() -> Self {
        Self {
            max_failed_tests: 0,
            min_sample_bits: 4096,
            critical_p_value: 1e-3,
        }
    }

    /// Lenient thresholds (for testing).
    pub fn permissive() -> Self {
        Self {
            max_failed_tests: 2,
            min_sample_bits: 128,
            critical_p_value: 1e-6,
        }
    }

    /// Checks a report against the thresholds.
    pub fn check(&self, report: &BatteryReport) -> Result<(), ThresholdViolation> {
        if report.sample_bits < self.min_sample_bits {
            return Err(ThresholdViolation::SampleTooSmall {
                observed: report.sample_bits,
                threshold: self.min_sample_bits,
            });
        }

        if let Some(worst) = report
            .results
            .iter()
            .filter(|r| r.p_value < self.critical_p_value)
            .min_by(|a, b| a.p_value.total_cmp(&b.p_value))
        {
            return Err(ThresholdViolation::CriticalFailure {
                test: worst.name.clone(),
                p_value: worst.p_value,
                threshold: self.critical_p_value,
            });
        }

        let failed = report.failed_count();
        if failed > self.max_failed_tests {
            return Err(ThresholdViolation::TooManyFailures {
                failed,
                allowed: self.max_failed_tests,
            });
        }

        Ok(())
    }
}

/// Threshold violation types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdViolation {
    #[error("sample of {observed} bits below minimum {threshold}")]
    SampleTooSmall { observed: usize, threshold: usize },

    #[error("{test} p-value {p_value:.6} below critical threshold {threshold:.6}")]
    CriticalFailure {
        test: String,
        p_value: f64,
        threshold: f64,
    },

    #[error("{failed} tests failed, at most {allowed} allowed")]
    TooManyFailures { failed: usize, allowed: usize },
}
