//! Reconciliation matching and aggregation
//!
//! One pure pass over the two input sets; both the scheduled daily run
//! and on-demand report generation call [`reconcile`], so there is a
//! single source of classification logic.

use crate::types::{
    ExternalTransactionRecord, ReconciliationRecord, ReconciliationReport, ReconciliationStatus,
    ReconciliationSummary,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use wallet_core::TransactionRecord;

/// Classify every transaction id seen on either side for `date`
///
/// - internal id absent externally → `MissingExternal`
/// - internal id present externally → exact decimal amount comparison:
///   `Matched` or `AmountMismatch` (note carries both amounts)
/// - external id absent internally → `MissingInternal`
///
/// Duplicate external ids within the set: the first occurrence wins the
/// lookup; later duplicates are logged and skipped for matching, but
/// their amounts still count toward `total_external_amount`. Either input
/// may be empty.
pub fn reconcile(
    date: NaiveDate,
    internal: &[TransactionRecord],
    external: &[ExternalTransactionRecord],
) -> ReconciliationReport {
    let mut external_map: HashMap<&str, &ExternalTransactionRecord> =
        HashMap::with_capacity(external.len());
    for record in external {
        if let Some(first) = external_map.get(record.transaction_id.as_str()) {
            tracing::warn!(
                transaction_id = %record.transaction_id,
                first_amount = %first.amount,
                duplicate_amount = %record.amount,
                "Duplicate external transaction id, keeping first occurrence"
            );
            continue;
        }
        external_map.insert(record.transaction_id.as_str(), record);
    }

    let internal_ids: HashMap<&str, &TransactionRecord> = internal
        .iter()
        .map(|t| (t.transaction_id.as_str(), t))
        .collect();

    let now = Utc::now();
    let mut records = Vec::with_capacity(internal.len() + external.len());

    for txn in internal {
        match external_map.get(txn.transaction_id.as_str()) {
            None => records.push(ReconciliationRecord {
                date,
                internal_transaction_id: Some(txn.transaction_id.as_str().to_string()),
                external_transaction_id: None,
                internal_amount: Some(txn.amount),
                external_amount: None,
                status: ReconciliationStatus::MissingExternal,
                notes: Some("Internal transaction not found in external system".to_string()),
                created_at: now,
            }),
            Some(ext) => {
                let (status, notes) = if txn.amount == ext.amount {
                    (ReconciliationStatus::Matched, None)
                } else {
                    (
                        ReconciliationStatus::AmountMismatch,
                        Some(format!(
                            "Amount mismatch - Internal: {}, External: {}",
                            txn.amount, ext.amount
                        )),
                    )
                };
                records.push(ReconciliationRecord {
                    date,
                    internal_transaction_id: Some(txn.transaction_id.as_str().to_string()),
                    external_transaction_id: Some(ext.transaction_id.clone()),
                    internal_amount: Some(txn.amount),
                    external_amount: Some(ext.amount),
                    status,
                    notes,
                    created_at: now,
                });
            }
        }
    }

    // Input order, not map order, so identical runs persist identical
    // record sequences
    let mut missing_seen: HashSet<&str> = HashSet::new();
    for record in external {
        let id = record.transaction_id.as_str();
        if internal_ids.contains_key(id) || !missing_seen.insert(id) {
            continue;
        }
        records.push(ReconciliationRecord {
            date,
            internal_transaction_id: None,
            external_transaction_id: Some(record.transaction_id.clone()),
            internal_amount: None,
            external_amount: Some(record.amount),
            status: ReconciliationStatus::MissingInternal,
            notes: Some("External transaction not found in internal system".to_string()),
            created_at: now,
        });
    }

    let summary = summarize(&records, internal, external);

    ReconciliationReport {
        date,
        summary,
        records,
    }
}

fn summarize(
    records: &[ReconciliationRecord],
    internal: &[TransactionRecord],
    external: &[ExternalTransactionRecord],
) -> ReconciliationSummary {
    let count =
        |status: ReconciliationStatus| records.iter().filter(|r| r.status == status).count();

    let total_internal_amount: Decimal = internal.iter().map(|t| t.amount).sum();
    let total_external_amount: Decimal = external.iter().map(|t| t.amount).sum();

    ReconciliationSummary {
        total_records: records.len(),
        matched_records: count(ReconciliationStatus::Matched),
        missing_internal_records: count(ReconciliationStatus::MissingInternal),
        missing_external_records: count(ReconciliationStatus::MissingExternal),
        amount_mismatch_records: count(ReconciliationStatus::AmountMismatch),
        total_internal_amount,
        total_external_amount,
        discrepancy_amount: (total_internal_amount - total_external_amount).abs(),
    }
}
