//! Summary event notification
//!
//! After a report persists, its summary goes to a downstream collaborator
//! fire-and-forget: a notify failure is logged and never fails report
//! generation.

use crate::{types::ReconciliationSummaryEvent, Error, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

/// Downstream consumer of reconciliation summaries
#[async_trait]
pub trait ReportNotifier: Send + Sync {
    /// Deliver one summary event
    async fn notify(&self, event: &ReconciliationSummaryEvent) -> Result<()>;
}

/// Default notifier: structured log line per report
pub struct LoggingNotifier;

#[async_trait]
impl ReportNotifier for LoggingNotifier {
    async fn notify(&self, event: &ReconciliationSummaryEvent) -> Result<()> {
        info!(
            date = %event.date,
            total_records = event.total_records,
            matched = event.matched_records,
            missing_internal = event.missing_internal_records,
            missing_external = event.missing_external_records,
            amount_mismatch = event.amount_mismatch_records,
            discrepancy = %event.discrepancy_amount,
            "Reconciliation summary published"
        );
        Ok(())
    }
}

/// Notifier that forwards events into a channel (test harnesses)
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<ReconciliationSummaryEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReconciliationSummaryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: tx }, rx)
    }
}

#[async_trait]
impl ReportNotifier for ChannelNotifier {
    async fn notify(&self, event: &ReconciliationSummaryEvent) -> Result<()> {
        self.sender
            .send(event.clone())
            .map_err(|_| Error::Notify("Summary channel closed".to_string()))
    }
}
