//! Main wallet ledger orchestration layer
//!
//! Ties together storage, the write actor, and the event outbox into a
//! high-level API for balance mutations.
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use wallet_core::{Config, CustomerId, TransactionId, WalletLedger};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let ledger = WalletLedger::open(Config::default())?;
//!
//!     let record = ledger
//!         .topup(
//!             CustomerId::new("CUST-001"),
//!             TransactionId::new("TXN-001"),
//!             Decimal::new(10000, 2),
//!             Some("signup bonus".to_string()),
//!         )
//!         .await?;
//!     assert_eq!(record.balance_after, Decimal::new(10000, 2));
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    events::{spawn_event_outbox, EventPublisher, LoggingPublisher},
    metrics::Metrics,
    storage::{CommitOutcome, Storage},
    types::{CustomerId, TransactionId, TransactionRecord, TransactionStatus, TransactionType, Wallet},
    Config, Error, Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Main wallet ledger interface
///
/// Mutations use optimistic concurrency: each attempt reads the wallet's
/// current `(balance, version)`, computes the new state, and submits a
/// commit conditional on the version being unchanged. A lost race re-reads
/// fresh state and retries, bounded by [`crate::config::RetryConfig`];
/// exhaustion surfaces as [`Error::ConcurrencyConflict`], which the caller
/// may retry safely thanks to transaction-id idempotency.
#[derive(Debug)]
pub struct WalletLedger {
    /// Actor handle for commits
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Prometheus metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl WalletLedger {
    /// Open ledger with configuration, logging events locally
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_publisher(config, Arc::new(LoggingPublisher))
    }

    /// Open ledger with a custom commit-event publisher
    pub fn open_with_publisher(config: Config, publisher: Arc<dyn EventPublisher>) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config.data_dir)?);

        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
        spawn_event_outbox(event_rx, publisher);
        let handle = spawn_ledger_actor(storage.clone(), event_tx);

        let metrics = Metrics::new().map_err(|e| Error::Config(format!("Metrics init failed: {}", e)))?;

        Ok(Self {
            handle,
            storage,
            metrics,
            config,
        })
    }

    /// Credit a wallet, creating it at balance zero if absent
    pub async fn topup(
        &self,
        customer_id: CustomerId,
        transaction_id: TransactionId,
        amount: Decimal,
        reference: Option<String>,
    ) -> Result<TransactionRecord> {
        tracing::info!(
            customer_id = %customer_id,
            transaction_id = %transaction_id,
            %amount,
            "Processing topup"
        );
        self.mutate(TransactionType::Topup, customer_id, transaction_id, amount, reference)
            .await
    }

    /// Debit a wallet
    pub async fn consume(
        &self,
        customer_id: CustomerId,
        transaction_id: TransactionId,
        amount: Decimal,
        reference: Option<String>,
    ) -> Result<TransactionRecord> {
        tracing::info!(
            customer_id = %customer_id,
            transaction_id = %transaction_id,
            %amount,
            "Processing consume"
        );
        self.mutate(TransactionType::Consume, customer_id, transaction_id, amount, reference)
            .await
    }

    /// Get current balance (zero when no wallet exists)
    pub fn get_balance(&self, customer_id: &CustomerId) -> Result<Decimal> {
        Ok(self
            .storage
            .get_wallet(customer_id)?
            .map(|w| w.balance)
            .unwrap_or(Decimal::ZERO))
    }

    /// Get a committed transaction by ID
    pub fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<TransactionRecord>> {
        self.storage.get_transaction(transaction_id)
    }

    /// Get transactions with commit time in `[start, end]` (inclusive)
    pub fn transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        self.storage.find_transactions_in_range(start, end)
    }

    /// Prometheus metrics for this ledger
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }

    /// Bounded optimistic read-compute-commit loop
    async fn mutate(
        &self,
        txn_type: TransactionType,
        customer_id: CustomerId,
        transaction_id: TransactionId,
        amount: Decimal,
        reference: Option<String>,
    ) -> Result<TransactionRecord> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(amount));
        }

        // Replay check before any balance logic: a committed id must
        // surface as DuplicateTransaction, not as WalletNotFound or
        // InsufficientBalance computed against post-commit state. The
        // write-point check in commit closes the remaining race.
        if self.storage.transaction_exists(&transaction_id)? {
            return Err(Error::DuplicateTransaction(transaction_id.to_string()));
        }

        let start = Instant::now();
        let max_attempts = self.config.retry.max_attempts;
        let backoff = Duration::from_millis(self.config.retry.backoff_ms);

        for attempt in 1..=max_attempts {
            // Fresh read every attempt; a stale balance is never reused
            let existing = self.storage.get_wallet(&customer_id)?;
            let expected_version = existing.as_ref().map(|w| w.version);

            let mut wallet = match (&existing, txn_type) {
                (Some(w), _) => w.clone(),
                (None, TransactionType::Topup) => Wallet::new(customer_id.clone()),
                (None, TransactionType::Consume) => {
                    return Err(Error::WalletNotFound(customer_id.to_string()));
                }
            };

            if txn_type == TransactionType::Consume && wallet.balance < amount {
                return Err(Error::InsufficientBalance {
                    available: wallet.balance,
                    required: amount,
                });
            }

            let balance_before = wallet.balance;
            let now = Utc::now();

            wallet.balance = match txn_type {
                TransactionType::Topup => balance_before + amount,
                TransactionType::Consume => balance_before - amount,
            };
            wallet.version += 1;
            wallet.updated_at = now;

            let txn = TransactionRecord {
                transaction_id: transaction_id.clone(),
                customer_id: customer_id.clone(),
                txn_type,
                amount,
                balance_before,
                balance_after: wallet.balance,
                status: TransactionStatus::Completed,
                reference: reference.clone(),
                created_at: now,
            };

            match self.handle.commit(expected_version, wallet.clone(), txn.clone()).await? {
                CommitOutcome::Committed => {
                    self.metrics.observe_commit(txn_type, "committed", start.elapsed());
                    tracing::info!(
                        customer_id = %customer_id,
                        transaction_id = %transaction_id,
                        balance = %wallet.balance,
                        "{} completed",
                        txn_type
                    );
                    return Ok(txn);
                }
                CommitOutcome::DuplicateTransaction => {
                    self.metrics.observe_commit(txn_type, "duplicate", start.elapsed());
                    return Err(Error::DuplicateTransaction(transaction_id.to_string()));
                }
                CommitOutcome::VersionConflict => {
                    self.metrics.inc_conflict(txn_type);
                    tracing::debug!(
                        customer_id = %customer_id,
                        transaction_id = %transaction_id,
                        attempt,
                        "Commit lost version race, retrying"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        self.metrics
            .observe_commit(txn_type, "conflict_exhausted", start.elapsed());
        tracing::warn!(
            customer_id = %customer_id,
            transaction_id = %transaction_id,
            attempts = max_attempts,
            "Mutation abandoned after retries"
        );
        Err(Error::ConcurrencyConflict(max_attempts))
    }
}
