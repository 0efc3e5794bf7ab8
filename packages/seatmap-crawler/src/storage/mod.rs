//! Record sinks receiving crawl output.
//!
//! Available sinks:
//! - `JsonlSink` - one JSON object per line in `<dir>/results.jsonl`
//! - `MemorySink` - in-memory, for tests and dry runs

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::CrawlRecord;

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlSink;
pub use memory::MemorySink;

/// Destination for crawl records.
///
/// Records are append-only; a sink never rewrites what it already holds.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn write(&self, record: &CrawlRecord) -> StorageResult<()>;
}

#[async_trait]
impl<K: RecordSink + ?Sized> RecordSink for std::sync::Arc<K> {
    async fn write(&self, record: &CrawlRecord) -> StorageResult<()> {
        (**self).write(record).await
    }
}
