//! Airline Seat-Map Catalog Crawler
//!
//! Crawls a seat-map catalog site carrier by carrier, picks the
//! highest-resolution seat-map image for every aircraft model it finds, and
//! appends normalized records to a sink.
//!
//! # Pipeline
//!
//! - Every request passes through one shared [`Throttle`]
//! - [`HttpFetcher`] retries transient failures with capped backoff
//! - [`Extractor`] turns listing pages into detail links and detail pages
//!   into a single [`SeatMapImageResult`]
//! - [`Normalizer`] maps free-form model text to canonical codes
//! - [`Orchestrator`] ties it together and writes [`CrawlRecord`]s
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use seatmap_crawler::{CrawlerConfig, HttpFetcher, JsonlSink, Orchestrator, Registry, Throttle};
//!
//! let config = CrawlerConfig::from_env()?;
//! let throttle = Arc::new(Throttle::new(config.delay));
//! let fetcher = HttpFetcher::new(&config, throttle)?;
//! let sink = JsonlSink::new(&config.output_dir);
//!
//! let mut orchestrator = Orchestrator::new(config, Arc::new(Registry::builtin()), fetcher, sink);
//! let report = orchestrator.crawl_carrier("CA", Some("A320")).await?;
//! ```
//!
//! # Modules
//!
//! - [`fetcher`] - `PageSource` trait and the HTTP implementation
//! - [`extractor`] - Listing and detail page extraction
//! - [`normalizer`] - Aircraft model keyword table
//! - [`registry`] - Supported carriers
//! - [`storage`] - Record sinks (JSONL, memory)
//! - [`crawler`] - Crawl orchestration
//! - [`testing`] - Offline page source for tests

pub mod config;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod normalizer;
pub mod registry;
pub mod storage;
pub mod testing;
pub mod throttle;
pub mod types;
pub mod validate;

// Re-export core types at crate root
pub use config::CrawlerConfig;
pub use crawler::Orchestrator;
pub use error::{
    ConfigError, CrawlError, CrawlResult, FetchError, FetchResult, ParseError, StorageError,
    StorageResult, ValidationError,
};
pub use extractor::Extractor;
pub use fetcher::{HttpFetcher, PageSource, RetryPolicy};
pub use normalizer::{KeywordTable, Normalizer};
pub use registry::Registry;
pub use storage::{JsonlSink, MemorySink, RecordSink};
pub use throttle::Throttle;
pub use types::{
    AircraftLinkCandidate, CarrierRecord, CarrierReport, CrawlPhase, CrawlRecord, CrawlStatistics,
    CrawlSummary, RecordRow, SeatMapImageResult,
};
pub use validate::{validate_aircraft_model, validate_iata_code};
