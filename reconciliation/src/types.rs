//! Core types for reconciliation
//!
//! A reconciliation run compares the internal transaction ledger against
//! an externally supplied record set for one date and classifies every
//! transaction id seen on either side.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally supplied transaction record (read-only input)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTransactionRecord {
    /// Transaction id as reported by the external system
    pub transaction_id: String,

    /// Customer the external system attributes the transaction to
    pub customer_id: String,

    /// Reported amount
    pub amount: Decimal,

    /// Reported type (opaque string, external vocabulary)
    pub txn_type: String,

    /// Reported timestamp
    pub timestamp: DateTime<Utc>,

    /// Reported reference
    pub reference: Option<String>,
}

/// Classification of one reconciled transaction id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReconciliationStatus {
    /// Present on both sides with equal amounts
    Matched = 1,
    /// Present externally, absent from the internal ledger
    MissingInternal = 2,
    /// Present internally, absent from the external set
    MissingExternal = 3,
    /// Present on both sides with differing amounts
    AmountMismatch = 4,
}

impl ReconciliationStatus {
    /// Stable string form (export, events)
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Matched => "MATCHED",
            ReconciliationStatus::MissingInternal => "MISSING_INTERNAL",
            ReconciliationStatus::MissingExternal => "MISSING_EXTERNAL",
            ReconciliationStatus::AmountMismatch => "AMOUNT_MISMATCH",
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persisted classification from a reconciliation run
///
/// Append-only and historical; records for a date are replaced as a set
/// when the date is reconciled again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    /// Date the run covered
    pub date: NaiveDate,

    /// Internal transaction id (absent for MissingInternal)
    pub internal_transaction_id: Option<String>,

    /// External transaction id (absent for MissingExternal)
    pub external_transaction_id: Option<String>,

    /// Internal amount (absent for MissingInternal)
    pub internal_amount: Option<Decimal>,

    /// External amount (absent for MissingExternal)
    pub external_amount: Option<Decimal>,

    /// Classification
    pub status: ReconciliationStatus,

    /// Human-readable detail (mismatch notes carry both amounts)
    pub notes: Option<String>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Aggregated statistics for one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Count of all classified records
    pub total_records: usize,

    /// MATCHED count
    pub matched_records: usize,

    /// MISSING_INTERNAL count
    pub missing_internal_records: usize,

    /// MISSING_EXTERNAL count
    pub missing_external_records: usize,

    /// AMOUNT_MISMATCH count
    pub amount_mismatch_records: usize,

    /// Sum of all internal amounts in the window
    pub total_internal_amount: Decimal,

    /// Sum of all external amounts
    pub total_external_amount: Decimal,

    /// `abs(total_internal_amount - total_external_amount)`
    pub discrepancy_amount: Decimal,
}

/// Full result of one reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Date covered
    pub date: NaiveDate,

    /// Aggregated statistics
    pub summary: ReconciliationSummary,

    /// Every classified record
    pub records: Vec<ReconciliationRecord>,
}

/// Summary event published after a report persists
///
/// Summary fields are inlined rather than nested so the event has a flat
/// wire shape and serializes under non-self-describing formats (bincode)
/// as well as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSummaryEvent {
    /// Date covered
    pub date: NaiveDate,

    /// Count of all classified records
    pub total_records: usize,

    /// MATCHED count
    pub matched_records: usize,

    /// MISSING_INTERNAL count
    pub missing_internal_records: usize,

    /// MISSING_EXTERNAL count
    pub missing_external_records: usize,

    /// AMOUNT_MISMATCH count
    pub amount_mismatch_records: usize,

    /// Sum of all internal amounts in the window
    pub total_internal_amount: Decimal,

    /// Sum of all external amounts
    pub total_external_amount: Decimal,

    /// `abs(total_internal_amount - total_external_amount)`
    pub discrepancy_amount: Decimal,

    /// Publication time (milliseconds since Unix epoch)
    pub generated_at_millis: i64,
}

impl ReconciliationSummaryEvent {
    /// Build the summary event for a finished report
    pub fn from_report(report: &ReconciliationReport) -> Self {
        let s = &report.summary;
        Self {
            date: report.date,
            total_records: s.total_records,
            matched_records: s.matched_records,
            missing_internal_records: s.missing_internal_records,
            missing_external_records: s.missing_external_records,
            amount_mismatch_records: s.amount_mismatch_records,
            total_internal_amount: s.total_internal_amount,
            total_external_amount: s.total_external_amount,
            discrepancy_amount: s.discrepancy_amount,
            generated_at_millis: Utc::now().timestamp_millis(),
        }
    }
}
