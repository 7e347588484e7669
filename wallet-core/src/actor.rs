//! Actor-based write path for the wallet ledger
//!
//! All mutations flow through a single writer task, which serves as the
//! race-free commit point:
//!
//! - the duplicate-id and version checks run in the same turn as the
//!   batch write, so no second request can interleave between check and
//!   commit;
//! - the commit event is pushed into the outbox in the same turn, which
//!   makes per-customer event emission order equal to commit order.
//!
//! Reads never enter the actor; they go straight to `Storage`.

use crate::{
    storage::{CommitOutcome, Storage},
    types::{TransactionRecord, Wallet, WalletEvent},
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Conditionally commit a wallet mutation
    Commit {
        /// Wallet version the caller read (`None` = wallet must not exist)
        expected_version: Option<u64>,
        /// Post-mutation wallet state
        wallet: Wallet,
        /// Transaction record to append
        txn: TransactionRecord,
        /// Reply channel
        response: oneshot::Sender<Result<CommitOutcome>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the write path
#[derive(Debug)]
pub struct LedgerActor {
    storage: Arc<Storage>,
    mailbox: mpsc::Receiver<LedgerMessage>,
    outbox: mpsc::UnboundedSender<WalletEvent>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        outbox: mpsc::UnboundedSender<WalletEvent>,
    ) -> Self {
        Self {
            storage,
            mailbox,
            outbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                LedgerMessage::Commit {
                    expected_version,
                    wallet,
                    txn,
                    response,
                } => {
                    let result = self.storage.commit(expected_version, &wallet, &txn);

                    if let Ok(CommitOutcome::Committed) = result {
                        // Durably committed; event delivery is decoupled
                        // from the caller's critical path
                        if self.outbox.send(WalletEvent::from_record(&txn)).is_err() {
                            tracing::warn!(
                                transaction_id = %txn.transaction_id,
                                "Event outbox closed, commit event dropped"
                            );
                        }
                    }

                    let _ = response.send(result);
                }
            }
        }
    }
}

/// Handle for sending commits to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Submit a conditional commit
    pub async fn commit(
        &self,
        expected_version: Option<u64>,
        wallet: Wallet,
        txn: TransactionRecord,
    ) -> Result<CommitOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Commit {
                expected_version,
                wallet,
                txn,
                response: tx,
            })
            .await
            .map_err(|_| Error::Internal("Ledger actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Internal("Ledger actor response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Internal("Ledger actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    outbox: mpsc::UnboundedSender<WalletEvent>,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded mailbox for backpressure
    let actor = LedgerActor::new(storage, rx, outbox);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerId, TransactionId, TransactionStatus, TransactionType};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn test_commit_args(txn_id: &str) -> (Wallet, TransactionRecord) {
        let mut wallet = Wallet::new(CustomerId::new("CUST-001"));
        wallet.balance = Decimal::new(10000, 2);
        wallet.version = 1;

        let txn = TransactionRecord {
            transaction_id: TransactionId::new(txn_id),
            customer_id: CustomerId::new("CUST-001"),
            txn_type: TransactionType::Topup,
            amount: Decimal::new(10000, 2),
            balance_before: Decimal::ZERO,
            balance_after: Decimal::new(10000, 2),
            status: TransactionStatus::Completed,
            reference: None,
            created_at: Utc::now(),
        };

        (wallet, txn)
    }

    #[tokio::test]
    async fn test_actor_commit_emits_event() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let handle = spawn_ledger_actor(storage, event_tx);

        let (wallet, txn) = test_commit_args("TXN-001");
        let outcome = handle.commit(None, wallet, txn).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);

        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.transaction_id, TransactionId::new("TXN-001"));
        assert_eq!(event.balance_after, Decimal::new(10000, 2));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_rejected_commit_emits_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let handle = spawn_ledger_actor(storage, event_tx);

        let (wallet, txn) = test_commit_args("TXN-001");
        handle.commit(None, wallet.clone(), txn.clone()).await.unwrap();
        let _ = event_rx.recv().await.unwrap();

        // Duplicate id: no commit, no event
        let outcome = handle.commit(Some(1), wallet, txn).await.unwrap();
        assert_eq!(outcome, CommitOutcome::DuplicateTransaction);
        assert!(event_rx.try_recv().is_err());

        handle.shutdown().await.unwrap();
    }
}
