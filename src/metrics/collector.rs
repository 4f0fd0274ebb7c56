//! Metrics collection and registry.

use crate::analysis::HealthMetrics;
use crate::protocol::{ProtocolError, SessionOutcome};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// What one finished session contributes to the metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Both peers accepted the same secret.
    pub accepted: bool,
    /// The session ran out of rounds or secret bits.
    pub exhausted: bool,
    /// Reconciliation rounds executed.
    pub rounds: u64,
    /// A single-bit correction resolved the mismatch.
    pub twiddle_corrected: bool,
    /// Parity bits published.
    pub parities_revealed: u64,
    /// Bits carried by the public link.
    pub public_bits: u64,
    /// Length of the agreed secret, zero on failure.
    pub secret_bits: u64,
}

impl MetricsSnapshot {
    /// Summarizes a session result.
    pub fn from_result(result: &Result<SessionOutcome, ProtocolError>) -> Self {
        match result {
            Ok(outcome) => {
                let responder = &outcome.responder;
                Self {
                    accepted: outcome.agreed(),
                    exhausted: false,
                    rounds: u64::from(responder.rounds),
                    twiddle_corrected: responder.twiddle_corrected,
                    parities_revealed: responder.parities_revealed as u64,
                    public_bits: responder.public_bits,
                    secret_bits: responder.secret.len() as u64,
                }
            }
            Err(ProtocolError::ReconciliationExhausted { rounds, .. }) => Self {
                exhausted: true,
                rounds: u64::from(*rounds),
                ..Self::default()
            },
            Err(_) => Self::default(),
        }
    }
}

/// Prometheus metrics registry for reconciliation sessions.
pub struct MetricsRegistry {
    registry: Registry,

    // Session outcomes
    sessions_total: IntCounter,
    accepted_total: IntCounter,
    exhausted_total: IntCounter,

    // Reconciliation cost
    rounds_total: IntCounter,
    twiddle_corrections_total: IntCounter,
    parity_bits_revealed_total: IntCounter,
    public_bits_total: IntCounter,
    secret_bits: IntGauge,

    // Source health
    source_health_status: IntGauge,
    source_samples: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let sessions_total =
            IntCounter::new("privacy_amp_sessions_total", "Total sessions run")?;
        let accepted_total = IntCounter::new(
            "privacy_amp_sessions_accepted_total",
            "Sessions that ended with an agreed secret",
        )?;
        let exhausted_total = IntCounter::new(
            "privacy_amp_sessions_exhausted_total",
            "Sessions that ran out of rounds or secret bits",
        )?;

        let rounds_total = IntCounter::new(
            "privacy_amp_reconcile_rounds_total",
            "Reconciliation rounds executed",
        )?;
        let twiddle_corrections_total = IntCounter::new(
            "privacy_amp_twiddle_corrections_total",
            "Mismatches resolved by a single-bit correction",
        )?;
        let parity_bits_revealed_total = IntCounter::new(
            "privacy_amp_parity_bits_revealed_total",
            "Parity bits published during reconciliation",
        )?;
        let public_bits_total = IntCounter::new(
            "privacy_amp_public_bits_total",
            "Bits carried by the public link",
        )?;
        let secret_bits = IntGauge::new(
            "privacy_amp_secret_bits",
            "Length of the most recently agreed secret",
        )?;

        let source_health_status = IntGauge::new(
            "privacy_amp_source_health_status",
            "Source health status (1=healthy, 0=unhealthy)",
        )?;
        let source_samples = IntGauge::new(
            "privacy_amp_source_samples",
            "Samples analyzed during source qualification",
        )?;

        registry.register(Box::new(sessions_total.clone()))?;
        registry.register(Box::new(accepted_total.clone()))?;
        registry.register(Box::new(exhausted_total.clone()))?;
        registry.register(Box::new(rounds_total.clone()))?;
        registry.register(Box::new(twiddle_corrections_total.clone()))?;
        registry.register(Box::new(parity_bits_revealed_total.clone()))?;
        registry.register(Box::new(public_bits_total.clone()))?;
        registry.register(Box::new(secret_bits.clone()))?;
        registry.register(Box::new(source_health_status.clone()))?;
        registry.register(Box::new(source_samples.clone()))?;

        Ok(Self {
            registry,
            sessions_total,
            accepted_total,
            exhausted_total,
            rounds_total,
            twiddle_corrections_total,
            parity_bits_revealed_total,
            public_bits_total,
            secret_bits,
            source_health_status,
            source_samples,
        })
    }

    /// Records one finished session.
    pub fn record(&self, snapshot: &MetricsSnapshot) {
        self.sessions_total.inc();
        if snapshot.accepted {
            self.accepted_total.inc();
        }
        if snapshot.exhausted {
            self.exhausted_total.inc();
        }
        if snapshot.twiddle_corrected {
            self.twiddle_corrections_total.inc();
        }
        self.rounds_total.inc_by(snapshot.rounds);
        self.parity_bits_revealed_total.inc_by(snapshot.parities_revealed);
        self.public_bits_total.inc_by(snapshot.public_bits);
        self.secret_bits.set(snapshot.secret_bits as i64);
    }

    /// Mirrors the state of a source health monitor.
    pub fn update_health(&self, health: &HealthMetrics) {
        self.source_health_status
            .set(if health.is_healthy { 1 } else { 0 });
        self.source_samples.set(health.total_samples as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
