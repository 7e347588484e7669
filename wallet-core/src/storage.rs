//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Wallet balances and versions (key: customer_id)
//! - `transactions` - Append-only transaction log (key: transaction_id)
//! - `txn_time_idx` - Commit-time index (key: timestamp_millis || transaction_id)
//!
//! A committed mutation writes the wallet, the transaction record, and the
//! time index entry in one atomic `WriteBatch`: either all persist or none
//! does. The version and duplicate-id checks happen under the commit lock,
//! at the same point as the write, so a stale read or a replayed id can
//! never slip in between check and write.

use crate::{
    error::{Error, Result},
    types::{CustomerId, TransactionId, TransactionRecord, Wallet},
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_TRANSACTIONS: &str = "transactions";
const CF_TXN_TIME_IDX: &str = "txn_time_idx";

/// Outcome of a conditional commit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Wallet and transaction persisted atomically
    Committed,
    /// Stored wallet version differs from the version the caller read;
    /// the caller must re-read and retry
    VersionConflict,
    /// Transaction id already committed; the prior record is authoritative
    DuplicateTransaction,
}

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    /// Serializes conditional commits (check + batch write)
    commit_lock: Mutex<()>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.db.path()).finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_TXN_TIME_IDX, Self::cf_options_index()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened wallet storage at {:?}", path);

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Mutex::new(()),
        })
    }

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Hot read path, favor decompression speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_index() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Wallet operations

    /// Get wallet by customer ID
    pub fn get_wallet(&self, customer_id: &CustomerId) -> Result<Option<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;

        match self.db.get_cf(cf, customer_id.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Transaction operations

    /// Get transaction by ID
    pub fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<TransactionRecord>> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        match self.db.get_cf(cf, transaction_id.as_str().as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Check whether a transaction ID is already committed
    pub fn transaction_exists(&self, transaction_id: &TransactionId) -> Result<bool> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        Ok(self.db.get_cf(cf, transaction_id.as_str().as_bytes())?.is_some())
    }

    /// Get transactions with commit time in `[start, end]` (inclusive)
    pub fn find_transactions_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        let cf_idx = self.cf_handle(CF_TXN_TIME_IDX)?;

        let start_key = start.timestamp_millis().to_be_bytes();
        let end_millis = end.timestamp_millis();

        let iter = self
            .db
            .iterator_cf(cf_idx, IteratorMode::From(&start_key, Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if key.len() < 8 {
                continue;
            }

            let ts_bytes: [u8; 8] = key[..8].try_into().expect("index key has 8-byte prefix");
            if i64::from_be_bytes(ts_bytes) > end_millis {
                break;
            }

            let txn_id = TransactionId::new(String::from_utf8_lossy(&key[8..]).into_owned());
            if let Some(record) = self.get_transaction(&txn_id)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    // Conditional commit

    /// Commit a wallet mutation and its transaction record atomically
    ///
    /// `expected_version` is the wallet version the caller read before
    /// computing the new state; `None` means the wallet must not exist yet
    /// (lazy creation by first topup). `wallet` is the post-mutation state.
    pub fn commit(
        &self,
        expected_version: Option<u64>,
        wallet: &Wallet,
        txn: &TransactionRecord,
    ) -> Result<CommitOutcome> {
        let _guard = self.commit_lock.lock();

        // Idempotency: uniqueness enforced at the write point
        if self.transaction_exists(&txn.transaction_id)? {
            return Ok(CommitOutcome::DuplicateTransaction);
        }

        // Version guard: the stored state must match what the caller read
        let stored_version = self.get_wallet(&wallet.customer_id)?.map(|w| w.version);
        if stored_version != expected_version {
            return Ok(CommitOutcome::VersionConflict);
        }

        let mut batch = WriteBatch::default();

        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        batch.put_cf(
            cf_wallets,
            wallet.customer_id.as_str().as_bytes(),
            bincode::serialize(wallet)?,
        );

        let cf_txns = self.cf_handle(CF_TRANSACTIONS)?;
        batch.put_cf(
            cf_txns,
            txn.transaction_id.as_str().as_bytes(),
            bincode::serialize(txn)?,
        );

        let cf_idx = self.cf_handle(CF_TXN_TIME_IDX)?;
        batch.put_cf(cf_idx, Self::time_index_key(txn), b"");

        self.db.write(batch)?;

        tracing::debug!(
            transaction_id = %txn.transaction_id,
            customer_id = %wallet.customer_id,
            version = wallet.version,
            "Transaction committed"
        );

        Ok(CommitOutcome::Committed)
    }

    fn time_index_key(txn: &TransactionRecord) -> Vec<u8> {
        let mut key = txn.created_at.timestamp_millis().to_be_bytes().to_vec();
        key.extend_from_slice(txn.transaction_id.as_str().as_bytes());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionStatus, TransactionType};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn test_wallet(customer: &str, balance: i64, version: u64) -> Wallet {
        let mut wallet = Wallet::new(CustomerId::new(customer));
        wallet.balance = Decimal::new(balance, 2);
        wallet.version = version;
        wallet
    }

    fn test_record(txn_id: &str, customer: &str, amount: i64, created_at: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            transaction_id: TransactionId::new(txn_id),
            customer_id: CustomerId::new(customer),
            txn_type: TransactionType::Topup,
            amount: Decimal::new(amount, 2),
            balance_before: Decimal::ZERO,
            balance_after: Decimal::new(amount, 2),
            status: TransactionStatus::Completed,
            reference: None,
            created_at,
        }
    }

    #[test]
    fn test_commit_and_read_back() {
        let (storage, _temp) = test_storage();

        let wallet = test_wallet("CUST-001", 10000, 1);
        let txn = test_record("TXN-001", "CUST-001", 10000, Utc::now());

        let outcome = storage.commit(None, &wallet, &txn).unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);

        let stored = storage.get_wallet(&CustomerId::new("CUST-001")).unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::new(10000, 2));
        assert_eq!(stored.version, 1);

        let record = storage
            .get_transaction(&TransactionId::new("TXN-001"))
            .unwrap()
            .unwrap();
        assert_eq!(record.amount, Decimal::new(10000, 2));
    }

    #[test]
    fn test_duplicate_transaction_rejected_at_write_point() {
        let (storage, _temp) = test_storage();

        let wallet = test_wallet("CUST-001", 10000, 1);
        let txn = test_record("TXN-001", "CUST-001", 10000, Utc::now());
        assert_eq!(storage.commit(None, &wallet, &txn).unwrap(), CommitOutcome::Committed);

        // Replay with a fresh wallet state is still rejected
        let wallet2 = test_wallet("CUST-001", 20000, 2);
        let outcome = storage.commit(Some(1), &wallet2, &txn).unwrap();
        assert_eq!(outcome, CommitOutcome::DuplicateTransaction);

        // Balance untouched
        let stored = storage.get_wallet(&CustomerId::new("CUST-001")).unwrap().unwrap();
        assert_eq!(stored.balance, Decimal::new(10000, 2));
    }

    #[test]
    fn test_version_conflict_on_stale_read() {
        let (storage, _temp) = test_storage();

        let wallet = test_wallet("CUST-001", 10000, 1);
        let txn = test_record("TXN-001", "CUST-001", 10000, Utc::now());
        storage.commit(None, &wallet, &txn).unwrap();

        // Caller read version 0 but stored version is 1
        let stale = test_wallet("CUST-001", 15000, 1);
        let txn2 = test_record("TXN-002", "CUST-001", 5000, Utc::now());
        let outcome = storage.commit(Some(0), &stale, &txn2).unwrap();
        assert_eq!(outcome, CommitOutcome::VersionConflict);
        assert!(!storage.transaction_exists(&TransactionId::new("TXN-002")).unwrap());
    }

    #[test]
    fn test_create_conflict_when_wallet_exists() {
        let (storage, _temp) = test_storage();

        let wallet = test_wallet("CUST-001", 10000, 1);
        let txn = test_record("TXN-001", "CUST-001", 10000, Utc::now());
        storage.commit(None, &wallet, &txn).unwrap();

        // Lost create race: expected no wallet, one exists
        let txn2 = test_record("TXN-002", "CUST-001", 5000, Utc::now());
        let outcome = storage.commit(None, &wallet, &txn2).unwrap();
        assert_eq!(outcome, CommitOutcome::VersionConflict);
    }

    #[test]
    fn test_find_transactions_in_range() {
        let (storage, _temp) = test_storage();

        let base = Utc::now();
        for (i, offset_mins) in [0i64, 10, 60 * 25].iter().enumerate() {
            let created = base + Duration::minutes(*offset_mins);
            let wallet = test_wallet("CUST-001", 10000 * (i as i64 + 1), i as u64 + 1);
            let txn = test_record(&format!("TXN-{:03}", i), "CUST-001", 10000, created);
            let expected = if i == 0 { None } else { Some(i as u64) };
            assert_eq!(
                storage.commit(expected, &wallet, &txn).unwrap(),
                CommitOutcome::Committed
            );
        }

        // Window covers the first two records only
        let records = storage
            .find_transactions_in_range(base - Duration::minutes(1), base + Duration::hours(1))
            .unwrap();
        assert_eq!(records.len(), 2);

        // Empty window
        let none = storage
            .find_transactions_in_range(base - Duration::hours(2), base - Duration::hours(1))
            .unwrap();
        assert!(none.is_empty());
    }
}
