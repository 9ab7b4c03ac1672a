//! Staging destinations for finished records.
//!
//! Every sink upserts on `source_url`: writing the same record twice leaves
//! one row, and the most recent write wins.

mod file;
mod postgrest;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::SinkError;
use crate::types::RecipeRecord;

pub use file::FileSink;
pub use postgrest::{PostgrestConfig, PostgrestSink, DEFAULT_STAGING_TABLE};

#[async_trait]
pub trait StagingSink: Send + Sync {
    /// Insert or replace the row keyed by `record.source_url`.
    async fn upsert(&self, record: &RecipeRecord) -> Result<(), SinkError>;
}

/// Keeps records in memory, keyed and ordered by `source_url`.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<BTreeMap<String, RecipeRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored rows, ordered by `source_url`.
    pub fn records(&self) -> Vec<RecipeRecord> {
        self.records
            .lock()
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, source_url: &str) -> Option<RecipeRecord> {
        self.records.lock().ok()?.get(source_url).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StagingSink for MemorySink {
    async fn upsert(&self, record: &RecipeRecord) -> Result<(), SinkError> {
        let mut records = self.records.lock().map_err(|_| SinkError::LockPoisoned)?;
        records.insert(record.source_url.clone(), record.clone());
        Ok(())
    }
}

/// Writes one JSON document per record to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl StagingSink for StdoutSink {
    async fn upsert(&self, record: &RecipeRecord) -> Result<(), SinkError> {
        println!("{}", serde_json::to_string(record)?);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use crate::types::ExtractStatus;

    #[tokio::test]
    async fn memory_sink_upserts_by_source_url() {
        let sink = MemorySink::new();
        sink.upsert(&record("https://a/1", ExtractStatus::Fail)).await.unwrap();
        sink.upsert(&record("https://a/2", ExtractStatus::Ok)).await.unwrap();
        sink.upsert(&record("https://a/1", ExtractStatus::Ok)).await.unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.get("https://a/1").unwrap().extract_status,
            ExtractStatus::Ok
        );
    }

    #[tokio::test]
    async fn poisoned_memory_sink_reports_an_error() {
        let sink = std::sync::Arc::new(MemorySink::new());
        let holder = sink.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = holder.records.lock().unwrap();
            panic!("writer died mid-update");
        })
        .join();
        assert!(panicked.is_err());

        let err = sink
            .upsert(&record("https://a/1", ExtractStatus::Ok))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::LockPoisoned));
    }
}
