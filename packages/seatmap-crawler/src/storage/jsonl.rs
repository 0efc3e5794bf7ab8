//! Line-delimited JSON sink.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::RecordSink;
use crate::error::{StorageError, StorageResult};
use crate::types::{CrawlRecord, RecordRow};

/// File name used inside the output directory.
pub const RESULTS_FILE: &str = "results.jsonl";

/// Appends one [`RecordRow`] per line to `<dir>/results.jsonl`.
///
/// The directory is created on first write. Writes are serialized so lines
/// from concurrent callers never interleave.
pub struct JsonlSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            path: output_dir.as_ref().join(RESULTS_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every row written so far. A missing file reads as empty.
    pub async fn read_rows(&self) -> StorageResult<Vec<RecordRow>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StorageError::from))
            .collect()
    }
}

#[async_trait]
impl RecordSink for JsonlSink {
    async fn write(&self, record: &CrawlRecord) -> StorageResult<()> {
        let mut line = serde_json::to_string(&record.to_row())?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), detail_url = %record.detail_url, "Record appended");
        Ok(())
    }
}
