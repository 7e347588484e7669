//! Main reconciliation engine
//!
//! Orchestrates ledger reads, the external source, matching, persistence,
//! and summary notification. The scheduled daily run and on-demand report
//! generation share the same pass.

use crate::{
    matching,
    notify::{LoggingNotifier, ReportNotifier},
    source::ExternalSource,
    store::ReportStore,
    types::{
        ReconciliationRecord, ReconciliationReport, ReconciliationStatus,
        ReconciliationSummaryEvent,
    },
    Result,
};
use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use wallet_core::WalletLedger;

/// Reconciliation engine
pub struct ReconciliationEngine {
    /// Internal ledger (read-only here)
    ledger: Arc<WalletLedger>,

    /// Persisted run output
    store: ReportStore,

    /// External source of truth
    source: Arc<dyn ExternalSource>,

    /// Summary event consumer
    notifier: Arc<dyn ReportNotifier>,
}

impl ReconciliationEngine {
    /// Create new engine with the default logging notifier
    pub fn new(ledger: Arc<WalletLedger>, store: ReportStore, source: Arc<dyn ExternalSource>) -> Self {
        Self {
            ledger,
            store,
            source,
            notifier: Arc::new(LoggingNotifier),
        }
    }

    /// Set summary notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn ReportNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Generate, persist, and publish a reconciliation report for one date
    ///
    /// Internal input: ledger transactions with commit time in
    /// `[date 00:00:00, date 23:59:59]`. External input: whatever the
    /// source returns for `date`; a source failure degrades to an empty
    /// external set (internal-only classification) with a warning.
    /// Reruns replace the date's previously persisted records.
    pub async fn generate_report(&self, date: NaiveDate) -> Result<ReconciliationReport> {
        tracing::info!(date = %date, "Generating reconciliation report");

        let start = date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let end = date
            .and_hms_opt(23, 59, 59)
            .expect("end of day is always valid")
            .and_utc();

        let internal = self.ledger.transactions_in_range(start, end)?;

        let external = match self.source.fetch(date).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    date = %date,
                    "External data unavailable, reconciling against empty set: {}",
                    e
                );
                Vec::new()
            }
        };

        let report = matching::reconcile(date, &internal, &external);

        // Read-only with respect to the ledger; persistence here is an
        // eventually-consistent snapshot and shares no transaction with
        // ledger writes
        self.store.replace_for_date(date, &report.records)?;

        let event = ReconciliationSummaryEvent::from_report(&report);
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(date = %date, "Failed to publish reconciliation summary: {}", e);
        }

        tracing::info!(
            date = %date,
            total_records = report.summary.total_records,
            discrepancy = %report.summary.discrepancy_amount,
            "Reconciliation report generated"
        );

        Ok(report)
    }

    /// Scheduled entry point: reconcile yesterday
    ///
    /// Errors are contained here so a failed run never aborts the
    /// recurring schedule.
    pub async fn run_daily(&self) {
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        tracing::info!(date = %yesterday, "Starting daily reconciliation");

        match self.generate_report(yesterday).await {
            Ok(report) => tracing::info!(
                date = %yesterday,
                total_records = report.summary.total_records,
                "Daily reconciliation completed"
            ),
            Err(e) => tracing::error!(date = %yesterday, "Daily reconciliation failed: {}", e),
        }
    }

    /// All persisted records for a date (latest run)
    pub fn records_for_date(&self, date: NaiveDate) -> Result<Vec<ReconciliationRecord>> {
        self.store.find_by_date(date)
    }

    /// Persisted AMOUNT_MISMATCH records for a date
    pub fn mismatches_for_date(&self, date: NaiveDate) -> Result<Vec<ReconciliationRecord>> {
        self.store
            .find_by_date_and_status(date, ReconciliationStatus::AmountMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChannelNotifier;
    use crate::source::StaticSource;
    use crate::types::ExternalTransactionRecord;
    use crate::Error;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use wallet_core::{Config, CustomerId, TransactionId};

    struct FailingSource;

    #[async_trait]
    impl crate::source::ExternalSource for FailingSource {
        async fn fetch(&self, _date: NaiveDate) -> Result<Vec<ExternalTransactionRecord>> {
            Err(Error::ExternalData("sftp drop missing".to_string()))
        }
    }

    struct TestEngine {
        engine: ReconciliationEngine,
        ledger: Arc<WalletLedger>,
        source: Arc<StaticSource>,
        _temp: tempfile::TempDir,
    }

    fn test_engine() -> TestEngine {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: temp.path().join("wallet"),
            ..Config::default()
        };
        let ledger = Arc::new(WalletLedger::open(config).unwrap());
        let store = ReportStore::open(temp.path().join("recon")).unwrap();
        let source = Arc::new(StaticSource::new());
        let engine = ReconciliationEngine::new(ledger.clone(), store, source.clone());

        TestEngine {
            engine,
            ledger,
            source,
            _temp: temp,
        }
    }

    fn external(id: &str, cents: i64) -> ExternalTransactionRecord {
        ExternalTransactionRecord {
            transaction_id: id.to_string(),
            customer_id: "CUST-001".to_string(),
            amount: Decimal::new(cents, 2),
            txn_type: "TOPUP".to_string(),
            timestamp: Utc::now(),
            reference: None,
        }
    }

    async fn seed_topup(ledger: &WalletLedger, id: &str, cents: i64) {
        ledger
            .topup(
                CustomerId::new("CUST-001"),
                TransactionId::new(id),
                Decimal::new(cents, 2),
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_report_for_todays_commits_and_matching_external() {
        let t = test_engine();
        let today = Utc::now().date_naive();

        seed_topup(&t.ledger, "T1", 10000).await;
        t.source.put(today, vec![external("T1", 10000)]);

        let report = t.engine.generate_report(today).await.unwrap();

        assert_eq!(report.summary.total_records, 1);
        assert_eq!(report.summary.matched_records, 1);
        assert_eq!(report.summary.discrepancy_amount, Decimal::ZERO);

        // Persisted and queryable
        let records = t.engine.records_for_date(today).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ReconciliationStatus::Matched);
    }

    #[tokio::test]
    async fn test_source_failure_degrades_to_empty_external_set() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: temp.path().join("wallet"),
            ..Config::default()
        };
        let ledger = Arc::new(WalletLedger::open(config).unwrap());
        let store = ReportStore::open(temp.path().join("recon")).unwrap();
        let engine = ReconciliationEngine::new(ledger.clone(), store, Arc::new(FailingSource));

        seed_topup(&ledger, "T1", 10000).await;

        let today = Utc::now().date_naive();
        let report = engine.generate_report(today).await.unwrap();

        // Internal-only classification
        assert_eq!(report.summary.total_records, 1);
        assert_eq!(report.summary.missing_external_records, 1);
        assert_eq!(report.summary.total_external_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_summary_event_published_per_report() {
        let t = test_engine();
        let (notifier, mut events) = ChannelNotifier::new();
        let engine = t.engine.with_notifier(Arc::new(notifier));

        seed_topup(&t.ledger, "T1", 10000).await;
        let today = Utc::now().date_naive();
        t.source.put(today, vec![external("T1", 9000)]);

        engine.generate_report(today).await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.date, today);
        assert_eq!(event.amount_mismatch_records, 1);
        assert_eq!(event.discrepancy_amount, Decimal::new(1000, 2));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let t = test_engine();
        let today = Utc::now().date_naive();

        seed_topup(&t.ledger, "T1", 10000).await;
        t.engine.generate_report(today).await.unwrap();
        assert_eq!(t.engine.records_for_date(today).unwrap().len(), 1);

        // Second run with the external side now present
        t.source.put(today, vec![external("T1", 10000)]);
        t.engine.generate_report(today).await.unwrap();

        let records = t.engine.records_for_date(today).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ReconciliationStatus::Matched);
    }

    #[tokio::test]
    async fn test_mismatches_query_filters_status() {
        let t = test_engine();
        let today = Utc::now().date_naive();

        seed_topup(&t.ledger, "T1", 10000).await;
        seed_topup(&t.ledger, "T2", 5000).await;
        t.source
            .put(today, vec![external("T1", 10000), external("T2", 4500)]);

        t.engine.generate_report(today).await.unwrap();

        let mismatches = t.engine.mismatches_for_date(today).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].internal_transaction_id.as_deref(), Some("T2"));
    }

    #[tokio::test]
    async fn test_empty_both_sides_yields_empty_report() {
        let t = test_engine();
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

        let report = t.engine.generate_report(date).await.unwrap();
        assert_eq!(report.summary.total_records, 0);
        assert!(t.engine.records_for_date(date).unwrap().is_empty());
    }
}
