//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - Immutability once committed

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Customer identifier (wallet key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(String);

impl CustomerId {
    /// Create new customer ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied transaction identifier, used as the idempotency key
/// for a mutation. Globally unique across the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Create new transaction ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-customer balance ledger
///
/// Created lazily on first topup, never deleted. The version counter
/// increments on every committed mutation and is the conflict-detection
/// guard for optimistic concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Owning customer (unique key)
    pub customer_id: CustomerId,

    /// Current balance (exact decimal, never negative)
    pub balance: Decimal,

    /// Monotonically increasing mutation counter
    pub version: u64,

    /// Wallet creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a fresh wallet at balance zero
    pub fn new(customer_id: CustomerId) -> Self {
        let now = Utc::now();
        Self {
            customer_id,
            balance: Decimal::ZERO,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Transaction type (credit or debit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionType {
    /// Credit the wallet
    Topup = 1,
    /// Debit the wallet
    Consume = 2,
}

impl TransactionType {
    /// Stable string form (event payloads, export)
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Topup => "TOPUP",
            TransactionType::Consume => "CONSUME",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Committed to the ledger
    Completed = 1,
}

impl TransactionStatus {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "COMPLETED",
        }
    }
}

/// Immutable ledger entry for a committed wallet mutation
///
/// Invariant: `balance_after == balance_before + amount` for Topup and
/// `balance_before - amount` for Consume. Replaying a wallet's committed
/// records in commit order from zero reproduces its stored balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Idempotency key (globally unique)
    pub transaction_id: TransactionId,

    /// Wallet this transaction applied to
    pub customer_id: CustomerId,

    /// Credit or debit
    pub txn_type: TransactionType,

    /// Mutation amount (strictly positive)
    pub amount: Decimal,

    /// Wallet balance before the mutation
    pub balance_before: Decimal,

    /// Wallet balance after the mutation
    pub balance_after: Decimal,

    /// Transaction status
    pub status: TransactionStatus,

    /// Caller-supplied reference
    pub reference: Option<String>,

    /// Commit timestamp
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Signed effect of this transaction on the wallet balance
    pub fn signed_amount(&self) -> Decimal {
        match self.txn_type {
            TransactionType::Topup => self.amount,
            TransactionType::Consume => -self.amount,
        }
    }

    /// Check the balance-transition invariant
    pub fn verify_balance_transition(&self) -> bool {
        self.balance_after == self.balance_before + self.signed_amount()
    }
}

/// Event published after a transaction commits durably
///
/// Delivered at-least-once; per customer, emission order matches commit
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEvent {
    /// Unique event id (time-ordered)
    pub event_id: uuid::Uuid,

    /// Committed transaction ID
    pub transaction_id: TransactionId,

    /// Wallet owner
    pub customer_id: CustomerId,

    /// Credit or debit
    pub txn_type: TransactionType,

    /// Mutation amount
    pub amount: Decimal,

    /// Balance before the mutation
    pub balance_before: Decimal,

    /// Balance after the mutation
    pub balance_after: Decimal,

    /// Transaction status
    pub status: TransactionStatus,

    /// Caller-supplied reference
    pub reference: Option<String>,

    /// Commit time (milliseconds since Unix epoch)
    pub timestamp_millis: i64,
}

impl WalletEvent {
    /// Build the commit event for a transaction record
    pub fn from_record(record: &TransactionRecord) -> Self {
        Self {
            event_id: uuid::Uuid::now_v7(),
            transaction_id: record.transaction_id.clone(),
            customer_id: record.customer_id.clone(),
            txn_type: record.txn_type,
            amount: record.amount,
            balance_before: record.balance_before,
            balance_after: record.balance_after,
            status: record.status,
            reference: record.reference.clone(),
            timestamp_millis: record.created_at.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(txn_type: TransactionType, before: i64, amount: i64, after: i64) -> TransactionRecord {
        TransactionRecord {
            transaction_id: TransactionId::new("TXN-001"),
            customer_id: CustomerId::new("CUST-001"),
            txn_type,
            amount: Decimal::new(amount, 2),
            balance_before: Decimal::new(before, 2),
            balance_after: Decimal::new(after, 2),
            status: TransactionStatus::Completed,
            reference: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_wallet_is_empty() {
        let wallet = Wallet::new(CustomerId::new("CUST-001"));
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert_eq!(wallet.version, 0);
    }

    #[test]
    fn test_balance_transition_topup() {
        let r = record(TransactionType::Topup, 1000, 500, 1500);
        assert!(r.verify_balance_transition());
        assert_eq!(r.signed_amount(), Decimal::new(500, 2));
    }

    #[test]
    fn test_balance_transition_consume() {
        let r = record(TransactionType::Consume, 1500, 500, 1000);
        assert!(r.verify_balance_transition());
        assert_eq!(r.signed_amount(), Decimal::new(-500, 2));
    }

    #[test]
    fn test_balance_transition_violation_detected() {
        let r = record(TransactionType::Topup, 1000, 500, 1400);
        assert!(!r.verify_balance_transition());
    }

    #[test]
    fn test_event_from_record() {
        let r = record(TransactionType::Topup, 0, 10000, 10000);
        let event = WalletEvent::from_record(&r);
        assert_eq!(event.transaction_id, r.transaction_id);
        assert_eq!(event.balance_after, r.balance_after);
        assert_eq!(event.timestamp_millis, r.created_at.timestamp_millis());
    }
}
