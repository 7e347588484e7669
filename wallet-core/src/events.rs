//! Commit event publishing
//!
//! Events leave the ledger through an outbox: the write actor pushes each
//! committed transaction's event into a channel, and a single drain task
//! hands them to an [`EventPublisher`]. Delivery is at-least-once and
//! fully decoupled from the committing call: a publish failure is logged
//! and never surfaces to, or rolls back, the commit.

use crate::{types::WalletEvent, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Downstream consumer of wallet commit events
///
/// Implementations wrap whatever transport the deployment uses (message
/// broker, webhook, test channel). Consumers must tolerate at-least-once
/// delivery.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish one commit event
    async fn publish(&self, event: &WalletEvent) -> Result<()>;
}

/// Default publisher: structured log line per event
#[derive(Debug)]
pub struct LoggingPublisher;

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish(&self, event: &WalletEvent) -> Result<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| crate::Error::Internal(e.to_string()))?;
        debug!(
            event_id = %event.event_id,
            transaction_id = %event.transaction_id,
            customer_id = %event.customer_id,
            payload = %payload,
            "Wallet event published"
        );
        Ok(())
    }
}

/// Publisher that forwards events into a channel (test and demo harnesses)
#[derive(Debug)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<WalletEvent>,
}

impl ChannelPublisher {
    /// Create a publisher and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WalletEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: tx }, rx)
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, event: &WalletEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| crate::Error::Internal("Event channel closed".to_string()))
    }
}

/// Spawn the outbox drain task
///
/// A single task preserves emission order; per customer that order equals
/// commit order because the write actor enqueues in commit order.
pub fn spawn_event_outbox(
    mut events: mpsc::UnboundedReceiver<WalletEvent>,
    publisher: Arc<dyn EventPublisher>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let Err(e) = publisher.publish(&event).await {
                warn!(
                    transaction_id = %event.transaction_id,
                    customer_id = %event.customer_id,
                    "Failed to publish wallet event: {}",
                    e
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerId, TransactionId, TransactionStatus, TransactionType};
    use rust_decimal::Decimal;

    fn test_event(txn_id: &str) -> WalletEvent {
        WalletEvent {
            event_id: uuid::Uuid::now_v7(),
            transaction_id: TransactionId::new(txn_id),
            customer_id: CustomerId::new("CUST-001"),
            txn_type: TransactionType::Topup,
            amount: Decimal::new(10000, 2),
            balance_before: Decimal::ZERO,
            balance_after: Decimal::new(10000, 2),
            status: TransactionStatus::Completed,
            reference: None,
            timestamp_millis: 0,
        }
    }

    #[tokio::test]
    async fn test_outbox_preserves_order() {
        let (publisher, mut received) = ChannelPublisher::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let _task = spawn_event_outbox(rx, Arc::new(publisher));

        for i in 0..5 {
            tx.send(test_event(&format!("TXN-{:03}", i))).unwrap();
        }

        for i in 0..5 {
            let event = received.recv().await.unwrap();
            assert_eq!(event.transaction_id, TransactionId::new(format!("TXN-{:03}", i)));
        }
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_drain() {
        struct FailingOnce {
            inner: ChannelPublisher,
            failed: parking_lot::Mutex<bool>,
        }

        #[async_trait]
        impl EventPublisher for FailingOnce {
            async fn publish(&self, event: &WalletEvent) -> Result<()> {
                {
                    let mut failed = self.failed.lock();
                    if !*failed {
                        *failed = true;
                        return Err(crate::Error::Internal("broker unavailable".to_string()));
                    }
                }
                self.inner.publish(event).await
            }
        }

        let (inner, mut received) = ChannelPublisher::new();
        let publisher = FailingOnce {
            inner,
            failed: parking_lot::Mutex::new(false),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let _task = spawn_event_outbox(rx, Arc::new(publisher));

        tx.send(test_event("TXN-001")).unwrap();
        tx.send(test_event("TXN-002")).unwrap();

        // First event is lost to the failing publish, second still flows
        let event = received.recv().await.unwrap();
        assert_eq!(event.transaction_id, TransactionId::new("TXN-002"));
    }
}
