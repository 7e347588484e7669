//! Error types for the wallet ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Consume on a nonexistent wallet (terminal)
    #[error("Wallet not found for customer: {0}")]
    WalletNotFound(String),

    /// Consume exceeds balance (terminal)
    #[error("Insufficient balance. Available: {available}, Required: {required}")]
    InsufficientBalance {
        /// Balance at the time of the attempt
        available: Decimal,
        /// Amount the caller requested
        required: Decimal,
    },

    /// Replayed transaction id (terminal; prior response is authoritative)
    #[error("Transaction ID already exists: {0}")]
    DuplicateTransaction(String),

    /// Optimistic retries exhausted under contention; the caller may
    /// safely retry the whole operation (idempotency holds)
    #[error("Concurrent update conflict after {0} attempts")]
    ConcurrencyConflict(u32),

    /// Non-positive or malformed amount (terminal)
    #[error("Amount must be positive, got: {0}")]
    InvalidAmount(Decimal),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unclassified failure; internal detail is not exposed
    #[error("Internal error")]
    Internal(String),
}

impl Error {
    /// True only for errors the caller may retry verbatim
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict(_))
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
