//! Reconciliation for the wallet settlement core
//!
//! Compares the internal transaction ledger against an external record
//! set date by date, classifies every transaction id seen on either
//! side, persists the classified records, and publishes a summary event
//! per run. A scheduler triggers the previous day's run once daily.
//!
//! # Classification
//!
//! - **MATCHED**: id on both sides, amounts equal
//! - **MISSING_EXTERNAL**: id only in the internal ledger
//! - **MISSING_INTERNAL**: id only in the external set
//! - **AMOUNT_MISMATCH**: id on both sides, amounts differ
//!
//! Reconciliation never mutates the ledger. An unavailable external
//! source degrades to an empty external set rather than failing the run.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod matching;
pub mod notify;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use engine::ReconciliationEngine;
pub use error::{Error, Result};
pub use notify::{LoggingNotifier, ReportNotifier};
pub use scheduler::{ReconciliationScheduler, ScheduleConfig};
pub use source::ExternalSource;
pub use store::ReportStore;
pub use types::{
    ExternalTransactionRecord, ReconciliationRecord, ReconciliationReport, ReconciliationStatus,
    ReconciliationSummary, ReconciliationSummaryEvent,
};
