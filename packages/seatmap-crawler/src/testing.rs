//! Testing utilities: an offline page source and a failing sink.
//!
//! Useful for exercising the orchestrator without network access.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{FetchError, FetchResult, StorageError, StorageResult};
use crate::fetcher::PageSource;
use crate::storage::RecordSink;
use crate::types::CrawlRecord;

/// Serves canned pages keyed by URL.
///
/// Unknown URLs answer 404. Every call is recorded, including failed ones.
#[derive(Default, Clone)]
pub struct FixtureSource {
    pages: Arc<RwLock<HashMap<String, String>>>,

    /// Forced statuses by URL, checked before pages
    failures: Arc<RwLock<HashMap<String, StatusCode>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<String>>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), body.into());
        self
    }

    /// Answer `url` with an HTTP error status.
    pub fn with_status(self, url: impl Into<String>, status: StatusCode) -> Self {
        self.failures.write().unwrap().insert(url.into(), status);
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl PageSource for FixtureSource {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.calls.write().unwrap().push(url.to_string());

        if let Some(status) = self.failures.read().unwrap().get(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            })
    }
}

/// Sink that rejects every record.
#[derive(Default)]
pub struct FailingSink {
    attempts: RwLock<usize>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.read().unwrap()
    }
}

#[async_trait]
impl RecordSink for FailingSink {
    async fn write(&self, _record: &CrawlRecord) -> StorageResult<()> {
        *self.attempts.write().unwrap() += 1;
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "sink unavailable",
        )))
    }
}
