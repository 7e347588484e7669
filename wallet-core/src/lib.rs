//! Wallet ledger for the wallet settlement core
//!
//! Per-customer wallet balances mutated by concurrent, idempotent
//! topup/consume requests, backed by an append-only transaction log.
//!
//! # Architecture
//!
//! - **Optimistic concurrency**: mutations are conditional on the wallet
//!   version read; lost races retry with fresh state, bounded at 3 attempts
//! - **Single writer**: one actor owns the commit point, making the
//!   duplicate-id check atomic with the write
//! - **Event outbox**: commit events are published asynchronously,
//!   at-least-once, in per-customer commit order
//!
//! # Invariants
//!
//! - Balance never negative after any committed operation
//! - `balance_after = balance_before ± amount` on every record
//! - Replaying a wallet's committed records from zero reproduces its balance
//! - A transaction id commits at most once

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventPublisher, LoggingPublisher};
pub use ledger::WalletLedger;
pub use types::{
    CustomerId, TransactionId, TransactionRecord, TransactionStatus, TransactionType, Wallet,
    WalletEvent,
};
