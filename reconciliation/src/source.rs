//! External record source
//!
//! The ingestion format (CSV, JSON, SFTP drop, ...) is a deployment
//! concern; the engine only consumes this trait. A fetch error never
//! fails a reconciliation run: the engine logs it and proceeds with an
//! empty external set.

use crate::{types::ExternalTransactionRecord, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Source of externally supplied transaction records
#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// Fetch all external records for one date (possibly none)
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<ExternalTransactionRecord>>;
}

/// In-memory source for tests and demos
#[derive(Default)]
pub struct StaticSource {
    records: RwLock<HashMap<NaiveDate, Vec<ExternalTransactionRecord>>>,
}

impl StaticSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records for a date
    pub fn put(&self, date: NaiveDate, records: Vec<ExternalTransactionRecord>) {
        self.records.write().insert(date, records);
    }
}

#[async_trait]
impl ExternalSource for StaticSource {
    async fn fetch(&self, date: NaiveDate) -> Result<Vec<ExternalTransactionRecord>> {
        Ok(self.records.read().get(&date).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_static_source_empty_by_default() {
        let source = StaticSource::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(source.fetch(date).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_source_returns_loaded_records() {
        let source = StaticSource::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        source.put(
            date,
            vec![ExternalTransactionRecord {
                transaction_id: "T1".to_string(),
                customer_id: "CUST-001".to_string(),
                amount: Decimal::new(10000, 2),
                txn_type: "TOPUP".to_string(),
                timestamp: Utc::now(),
                reference: None,
            }],
        );

        let records = source.fetch(date).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_id, "T1");
    }
}
