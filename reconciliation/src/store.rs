//! Persistence for reconciliation records
//!
//! RocksDB column family keyed by `date (ISO-8601) || seq (be u32)`, so a
//! date's records sit in one contiguous key range. Reruns are idempotent:
//! replacing a date deletes its previous records and writes the new set
//! in one atomic `WriteBatch`.

use crate::{
    error::{Error, Result},
    types::{ReconciliationRecord, ReconciliationStatus},
};
use chrono::NaiveDate;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

const CF_RECORDS: &str = "recon_records";

/// Reconciliation record store
pub struct ReportStore {
    db: Arc<DB>,
}

impl ReportStore {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let mut cf_opts = Options::default();
        cf_opts.set_compression_type(rocksdb::DBCompressionType::Zstd);

        let db = DB::open_cf_descriptors(
            &db_opts,
            path,
            vec![ColumnFamilyDescriptor::new(CF_RECORDS, cf_opts)],
        )?;

        tracing::info!("Opened reconciliation store at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_RECORDS)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", CF_RECORDS)))
    }

    fn record_key(date: NaiveDate, seq: u32) -> Vec<u8> {
        let mut key = date.format("%Y-%m-%d").to_string().into_bytes();
        key.extend_from_slice(&seq.to_be_bytes());
        key
    }

    fn date_prefix(date: NaiveDate) -> Vec<u8> {
        date.format("%Y-%m-%d").to_string().into_bytes()
    }

    /// Replace a date's records with a fresh run's output (atomic)
    pub fn replace_for_date(&self, date: NaiveDate, records: &[ReconciliationRecord]) -> Result<()> {
        let cf = self.cf()?;
        let mut batch = WriteBatch::default();

        for key in self.keys_for_date(date)? {
            batch.delete_cf(cf, key);
        }

        for (seq, record) in records.iter().enumerate() {
            batch.put_cf(
                cf,
                Self::record_key(date, seq as u32),
                bincode::serialize(record)?,
            );
        }

        self.db.write(batch)?;

        tracing::info!(
            date = %date,
            record_count = records.len(),
            "Reconciliation records persisted"
        );

        Ok(())
    }

    /// Get all records for a date (latest run)
    pub fn find_by_date(&self, date: NaiveDate) -> Result<Vec<ReconciliationRecord>> {
        let cf = self.cf()?;
        let prefix = Self::date_prefix(date);

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            records.push(bincode::deserialize(&value)?);
        }

        Ok(records)
    }

    /// Get a date's records filtered by status
    pub fn find_by_date_and_status(
        &self,
        date: NaiveDate,
        status: ReconciliationStatus,
    ) -> Result<Vec<ReconciliationRecord>> {
        Ok(self
            .find_by_date(date)?
            .into_iter()
            .filter(|r| r.status == status)
            .collect())
    }

    fn keys_for_date(&self, date: NaiveDate) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf()?;
        let prefix = Self::date_prefix(date);

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut keys = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            keys.push(key.to_vec());
        }

        Ok(keys)
    }
}
