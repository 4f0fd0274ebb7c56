//! Source health monitoring.
//!
//! Tracks battery results over consecutive samples and implements
//! fail-closed behavior: a source is untrusted until it passes a streak
//! of samples and becomes untrusted again on the first bad one.

use super::{check_random, AnalysisError, BatteryReport, QualityThresholds, ThresholdViolation};
use crate::bits::BitVector;
use crate::source::EntropySource;

/// Current health status of a source.
#[derive(Debug, Clone)]
pub struct HealthMetrics {
    /// Most recent battery report.
    pub latest_report: Option<BatteryReport>,
    /// Whether the source is currently trusted.
    pub is_healthy: bool,
    /// Most recent violation, if any.
    pub last_violation: Option<ThresholdViolation>,
    /// Consecutive healthy samples.
    pub consecutive_healthy: u64,
    /// Consecutive unhealthy samples.
    pub consecutive_unhealthy: u64,
    /// Total samples analyzed.
    pub total_samples: u64,
}

impl Default for HealthMetrics {
    fn default() -> Self {
        Self {
            latest_report: None,
            is_healthy: false, // Fail-closed: unhealthy until proven otherwise
            last_violation: None,
            consecutive_healthy: 0,
            consecutive_unhealthy: 0,
            total_samples: 0,
        }
    }
}

/// Monitors source health over time.
pub struct HealthMonitor {
    thresholds: QualityThresholds,
    metrics: HealthMetrics,
    /// Consecutive passing samples required to become healthy.
    required_healthy_streak: u64,
}

impl HealthMonitor {
    /// Creates a monitor requiring three good samples in a row.
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self::with_streak_requirement(thresholds, 3)
    }

    /// Creates a monitor with a custom healthy streak requirement.
    pub fn with_streak_requirement(thresholds: QualityThresholds, streak: u64) -> Self {
        Self {
            thresholds,
            metrics: HealthMetrics::default(),
            required_healthy_streak: streak.max(1),
        }
    }

    /// Runs the battery over `sample` and updates the health status.
    ///
    /// Samples too short for the battery are an error and leave the
    /// status unchanged.
    pub fn analyze(&mut self, sample: &BitVector) -> Result<&HealthMetrics, AnalysisError> {
        let report = check_random(sample)?;
        self.metrics.total_samples += 1;

        match self.thresholds.check(&report) {
            Ok(()) => {
                self.metrics.consecutive_healthy += 1;
                self.metrics.consecutive_unhealthy = 0;
                self.metrics.last_violation = None;

                if self.metrics.consecutive_healthy >= self.required_healthy_streak {
                    if !self.metrics.is_healthy {
                        tracing::info!(
                            streak = self.metrics.consecutive_healthy,
                            "entropy source became healthy"
                        );
                    }
                    self.metrics.is_healthy = true;
                }

                tracing::trace!(
                    failed = report.failed_count(),
                    bits = report.sample_bits,
                    "health check passed"
                );
            }
            Err(violation) => {
                self.metrics.consecutive_unhealthy += 1;
                self.metrics.consecutive_healthy = 0;

                // Fail closed on the first bad sample.
                if self.metrics.is_healthy {
                    tracing::warn!(violation = %violation, "entropy source became unhealthy");
                } else {
                    tracing::debug!(violation = %violation, "health check failed");
                }
                self.metrics.last_violation = Some(violation);
                self.metrics.is_healthy = false;
            }
        }

        self.metrics.latest_report = Some(report);
        Ok(&self.metrics)
    }

    /// Draws up to `max_samples` samples of `sample_bits` from `source`
    /// until the monitor is healthy.
    pub fn qualify<S: EntropySource + ?Sized>(
        &mut self,
        source: &mut S,
        sample_bits: usize,
        max_samples: usize,
    ) -> Result<bool, AnalysisError> {
        for _ in 0..max_samples {
            let sample = source.get_bits(sample_bits)?;
            if self.analyze(&sample)?.is_healthy {
                return Ok(true);
            }
        }
        tracing::warn!(
            samples = max_samples,
            violation = ?self.metrics.last_violation,
            "source failed qualification"
        );
        Ok(false)
    }

    /// Returns current health metrics.
    pub fn metrics(&self) -> &HealthMetrics {
        &self.metrics
    }

    /// Returns true if the source may be used.
    pub fn is_healthy(&self) -> bool {
        self.metrics.is_healthy
    }

    /// Resets the monitor to its initial, untrusted state.
    pub fn reset(&mut self) {
        self.metrics = HealthMetrics::default();
        tracing::info!("health monitor reset");
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(QualityThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::hashed_bits;
    use crate::source::SourceError;

    fn make_good_data(tag: u64) -> BitVector {
        hashed_bits(tag, 128)
    }

    fn make_bad_data() -> BitVector {
        BitVector::from_bytes(&[0xFF; 128])
    }

    /// Replays fixed samples, then repeats the last one.
    struct Replay(Vec<BitVector>);

    impl EntropySource for Replay {
        fn get_bits(&mut self, n: usize) -> Result<BitVector, SourceError> {
            let sample = if self.0.len() > 1 {
                self.0.remove(0)
            } else {
                self.0[0].clone()
            };
            Ok(sample.first(n)?)
        }
    }

    #[test]
    fn test_starts_unhealthy() {
        let monitor = HealthMonitor::new(QualityThresholds::permissive());
        assert!(!monitor.is_healthy());
    }

    #[test]
    fn test_becomes_healthy_after_streak() {
        let mut monitor =
            HealthMonitor::with_streak_requirement(QualityThresholds::permissive(), 2);

        // First good sample: not healthy yet
        monitor.analyze(&make_good_data(1)).unwrap();
        assert!(!monitor.is_healthy());

        // Second good sample: now healthy
        monitor.analyze(&make_good_data(2)).unwrap();
        assert!(monitor.is_healthy());
    }

    #[test]
    fn test_immediately_unhealthy_on_failure() {
        let mut monitor =
            HealthMonitor::with_streak_requirement(QualityThresholds::permissive(), 2);

        monitor.analyze(&make_good_data(1)).unwrap();
        monitor.analyze(&make_good_data(2)).unwrap();
        assert!(monitor.is_healthy());

        // Single bad sample makes unhealthy (fail-closed)
        let metrics = monitor.analyze(&make_bad_data()).unwrap();
        assert!(!metrics.is_healthy);
        assert!(metrics.last_violation.is_some());
        assert_eq!(metrics.total_samples, 3);
    }

    #[test]
    fn test_short_sample_is_error() {
        let mut monitor = HealthMonitor::default();
        assert!(monitor.analyze(&BitVector::zeros(64)).is_err());
        assert_eq!(monitor.metrics().total_samples, 0);
    }

    #[test]
    fn test_qualify_good_source() {
        let mut monitor = HealthMonitor::new(QualityThresholds::default());
        let mut source = Replay(vec![make_good_data(1), make_good_data(2), make_good_data(4)]);
        assert!(monitor.qualify(&mut source, 1024, 5).unwrap());
    }

    #[test]
    fn test_qualify_bad_source() {
        let mut monitor = HealthMonitor::new(QualityThresholds::default());
        let mut source = Replay(vec![make_bad_data()]);
        assert!(!monitor.qualify(&mut source, 1024, 4).unwrap());
        assert_eq!(monitor.metrics().consecutive_unhealthy, 4);
    }

    #[test]
    fn test_reset() {
        let mut monitor = HealthMonitor::with_streak_requirement(QualityThresholds::permissive(), 1);
        monitor.analyze(&make_good_data(1)).unwrap();
        assert!(monitor.is_healthy());
        monitor.reset();
        assert!(!monitor.is_healthy());
    }
}
