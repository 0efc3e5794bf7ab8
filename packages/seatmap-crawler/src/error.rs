//! Typed errors for the seat-map crawler.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! skipped page from a rejected carrier.

use thiserror::Error;

/// Errors raised while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client could not be built (bad header value, TLS backend)
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// URL could not be parsed; never retried
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Timeout, connection failure or broken body
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Every attempt failed; carries the last cause
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could succeed.
    ///
    /// Timeouts, connection errors, 5xx and 429 are transient. Malformed URLs
    /// and other statuses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Client(_) | FetchError::InvalidUrl { .. } => false,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            FetchError::RetriesExhausted { .. } => false,
        }
    }
}

/// Errors raised while interpreting page markup.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Page URL used to resolve relative links is unusable
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Errors raised by a record sink.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors surfaced by the crawl orchestrator.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Carrier code is not in the registry; no request was made
    #[error("unsupported carrier: {code}")]
    UnsupportedCarrier { code: String },

    /// Listing page could not be fetched
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
}

/// Malformed external identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("IATA code must not be empty")]
    EmptyIataCode,

    #[error("IATA code must be 2-3 characters, got {0:?}")]
    IataLength(String),

    #[error("IATA code may only contain letters and digits, got {0:?}")]
    IataCharacters(String),

    #[error("aircraft model must not be empty")]
    EmptyModel,

    #[error("aircraft model must be at most 20 characters, got {0}")]
    ModelTooLong(usize),

    #[error("aircraft model contains invalid characters: {0:?}")]
    ModelCharacters(String),
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for sink operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
