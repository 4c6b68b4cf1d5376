//! Metrics collection for observability
//!
//! Prometheus metrics for the transaction pipeline. Each ledger owns its own
//! registry so several ledgers can live in one process.
//!
//! # Metrics
//!
//! - `ledger_transactions_applied_total` - Transactions fully applied
//! - `ledger_transactions_rejected_total{reason}` - Transactions refused, by reason
//! - `ledger_registered_accounts` - Accounts currently in the registry
//! - `ledger_apply_duration_seconds` - Histogram of settlement latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Transactions fully applied
    pub transactions_applied: IntCounter,

    /// Transactions refused, labelled by reason
    pub transactions_rejected: IntCounterVec,

    /// Accounts currently registered
    pub registered_accounts: IntGauge,

    /// Settlement duration histogram
    pub apply_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transactions_applied = IntCounter::new(
            "ledger_transactions_applied_total",
            "Total number of transactions applied",
        )?;
        registry.register(Box::new(transactions_applied.clone()))?;

        let transactions_rejected = IntCounterVec::new(
            Opts::new(
                "ledger_transactions_rejected_total",
                "Total number of transactions rejected",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(transactions_rejected.clone()))?;

        let registered_accounts = IntGauge::new(
            "ledger_registered_accounts",
            "Number of accounts in the registry",
        )?;
        registry.register(Box::new(registered_accounts.clone()))?;

        let apply_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_apply_duration_seconds",
                "Histogram of transaction settlement latencies",
            )
            .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.010, 0.050]),
        )?;
        registry.register(Box::new(apply_duration.clone()))?;

        Ok(Self {
            transactions_applied,
            transactions_rejected,
            registered_accounts,
            apply_duration,
            registry,
        })
    }

    /// Record a fully applied transaction
    pub fn record_applied(&self, duration_seconds: f64) {
        self.transactions_applied.inc();
        self.apply_duration.observe(duration_seconds);
    }

    /// Record a rejected transaction
    pub fn record_rejected(&self, reason: &str) {
        self.transactions_rejected.with_label_values(&[reason]).inc();
    }

    /// Count of rejections for `reason`
    pub fn rejected(&self, reason: &str) -> u64 {
        self.transactions_rejected.with_label_values(&[reason]).get()
    }

    /// Update registry size
    pub fn set_registered_accounts(&self, count: usize) {
        self.registered_accounts.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("transactions_applied", &self.transactions_applied.get())
            .field("registered_accounts", &self.registered_accounts.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.transactions_applied.get(), 0);
        assert_eq!(metrics.registered_accounts.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_applied(0.001);
        assert_eq!(first.transactions_applied.get(), 1);
        assert_eq!(second.transactions_applied.get(), 0);
    }

    #[test]
    fn test_record_rejected_by_reason() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejected("insufficient_funds");
        metrics.record_rejected("insufficient_funds");
        metrics.record_rejected("inactive_account");

        assert_eq!(metrics.rejected("insufficient_funds"), 2);
        assert_eq!(metrics.rejected("inactive_account"), 1);
        assert_eq!(metrics.rejected("overflow"), 0);
    }

    #[test]
    fn test_registry_gathers_all_families() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejected("invalid");
        metrics.set_registered_accounts(3);

        let names: Vec<String> = metrics
            .registry()
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();

        assert!(names.contains(&"ledger_transactions_applied_total".to_string()));
        assert!(names.contains(&"ledger_transactions_rejected_total".to_string()));
        assert!(names.contains(&"ledger_registered_accounts".to_string()));
        assert_eq!(metrics.registered_accounts.get(), 3);
    }
}
