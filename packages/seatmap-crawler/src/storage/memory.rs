//! In-memory sink for testing and development.

use async_trait::async_trait;
use std::sync::RwLock;

use super::RecordSink;
use crate::error::StorageResult;
use crate::types::CrawlRecord;

/// Keeps every written record in memory.
///
/// Not suitable for real crawls as data is lost on exit.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<Vec<CrawlRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records written so far, in write order.
    pub fn records(&self) -> Vec<CrawlRecord> {
        self.records.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&self, record: &CrawlRecord) -> StorageResult<()> {
        self.records.write().unwrap().push(record.clone());
        Ok(())
    }
}
