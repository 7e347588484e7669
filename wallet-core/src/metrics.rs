//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `wallet_transactions_total` - Committed/rejected mutations by type and outcome
//! - `wallet_commit_conflicts_total` - Version-conflict retries by type
//! - `wallet_commit_duration_seconds` - Mutation latency histogram

use crate::types::TransactionType;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector
///
/// Registered against its own registry so several ledgers can coexist in
/// one process (tests open many).
#[derive(Clone)]
pub struct Metrics {
    /// Mutations by type and outcome
    transactions_total: IntCounterVec,

    /// Version conflicts encountered by the retry loop
    commit_conflicts_total: IntCounterVec,

    /// End-to-end mutation latency
    commit_duration: Histogram,

    /// Prometheus registry
    registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_total = IntCounterVec::new(
            Opts::new("wallet_transactions_total", "Wallet mutations by type and outcome"),
            &["type", "outcome"],
        )?;
        registry.register(Box::new(transactions_total.clone()))?;

        let commit_conflicts_total = IntCounterVec::new(
            Opts::new(
                "wallet_commit_conflicts_total",
                "Optimistic version conflicts by mutation type",
            ),
            &["type"],
        )?;
        registry.register(Box::new(commit_conflicts_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_commit_duration_seconds",
                "Mutation latency including retries",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            transactions_total,
            commit_conflicts_total,
            commit_duration,
            registry,
        })
    }

    /// Record a finished mutation attempt chain
    pub fn observe_commit(&self, txn_type: TransactionType, outcome: &str, elapsed: Duration) {
        self.transactions_total
            .with_label_values(&[txn_type.as_str(), outcome])
            .inc();
        self.commit_duration.observe(elapsed.as_secs_f64());
    }

    /// Record one version conflict
    pub fn inc_conflict(&self, txn_type: TransactionType) {
        self.commit_conflicts_total
            .with_label_values(&[txn_type.as_str()])
            .inc();
    }

    /// Registry for scrape endpoints
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_and_count() {
        let metrics = Metrics::new().unwrap();

        metrics.observe_commit(TransactionType::Topup, "committed", Duration::from_millis(2));
        metrics.inc_conflict(TransactionType::Consume);

        let families = metrics.registry().gather();
        assert!(families.iter().any(|f| f.get_name() == "wallet_transactions_total"));
        assert!(families.iter().any(|f| f.get_name() == "wallet_commit_conflicts_total"));
    }

    #[test]
    fn test_multiple_collectors_coexist() {
        let _a = Metrics::new().unwrap();
        let _b = Metrics::new().unwrap();
    }
}
