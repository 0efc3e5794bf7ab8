//! Crawler configuration.

use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for a crawl session.
///
/// Constructed once at startup and shared by reference with the fetcher,
/// extractor and orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Catalog site root.
    pub base_url: String,

    /// Listing page path; `{code}` is replaced with the lower-case IATA code.
    pub listing_path: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Additional attempts after the first failed one.
    pub retries: u32,

    /// Minimum gap between outbound requests. Zero disables throttling.
    pub delay: Duration,

    /// Pause between carriers in `crawl_all`.
    ///
    /// Default: twice `delay`. Never shorter than `delay`.
    pub carrier_gap: Duration,

    /// First retry backoff; doubles per attempt.
    pub backoff_base: Duration,

    /// Upper bound for a single backoff sleep.
    pub backoff_ceiling: Duration,

    pub user_agent: String,

    /// Directory receiving `results.jsonl`.
    pub output_dir: String,

    /// Host serving seat-map images.
    pub image_host: String,

    /// Path fragments identifying seat-map images on listing pages.
    pub seatmap_markers: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.aerolopa.com".to_string(),
            listing_path: "/airline/{code}".to_string(),
            timeout: Duration::from_secs(15),
            retries: 3,
            delay: Duration::from_secs(1),
            carrier_gap: Duration::from_secs(2),
            backoff_base: Duration::from_secs(1),
            backoff_ceiling: Duration::from_secs(4),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            output_dir: "data".to_string(),
            image_host: "images.squarespace-cdn.com".to_string(),
            seatmap_markers: vec!["/content/".to_string()],
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `AEROLOPA_*` environment variables.
    ///
    /// A `.env` file is read first when present. Unset variables keep their
    /// defaults; unparsable numbers are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();

        let mut config = Self::default();

        if let Ok(v) = env::var("AEROLOPA_BASE_URL") {
            config.base_url = v;
        }
        if let Ok(v) = env::var("AEROLOPA_LISTING_PATH") {
            config.listing_path = v;
        }
        if let Some(secs) = env_seconds("AEROLOPA_TIMEOUT")? {
            config.timeout = secs;
        }
        if let Ok(v) = env::var("AEROLOPA_RETRIES") {
            config.retries = v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: "AEROLOPA_RETRIES",
                value: v.clone(),
            })?;
        }
        if let Some(delay) = env_delay("AEROLOPA_DELAY")? {
            config.delay = delay;
            config.carrier_gap = delay * 2;
        }
        if let Some(gap) = env_seconds("AEROLOPA_CARRIER_GAP")? {
            config.carrier_gap = gap;
        }
        if let Ok(v) = env::var("AEROLOPA_USER_AGENT") {
            config.user_agent = v;
        }
        if let Ok(v) = env::var("AEROLOPA_OUTPUT_DIR") {
            config.output_dir = v;
        }
        if let Ok(v) = env::var("AEROLOPA_IMAGE_HOST") {
            config.image_host = v;
        }
        if let Ok(v) = env::var("AEROLOPA_SEATMAP_MARKERS") {
            config.seatmap_markers = parse_list(&v);
        }

        config.carrier_gap = config.effective_carrier_gap();
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_listing_path(mut self, path: impl Into<String>) -> Self {
        self.listing_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the politeness delay. Also resets the carrier gap to twice the delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self.carrier_gap = delay * 2;
        self
    }

    /// Set the pause between carriers, raised to `delay` if shorter.
    pub fn with_carrier_gap(mut self, gap: Duration) -> Self {
        self.carrier_gap = gap.max(self.delay);
        self
    }

    /// Pause actually taken between carriers.
    pub fn effective_carrier_gap(&self) -> Duration {
        self.carrier_gap.max(self.delay)
    }

    pub fn with_backoff(mut self, base: Duration, ceiling: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_ceiling = ceiling;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_image_host(mut self, host: impl Into<String>) -> Self {
        self.image_host = host.into();
        self
    }

    pub fn with_seatmap_markers(mut self, markers: Vec<String>) -> Self {
        self.seatmap_markers = markers;
        self
    }

    /// Listing page URL for a carrier.
    pub fn listing_url(&self, iata_code: &str) -> String {
        let path = self
            .listing_path
            .replace("{code}", &iata_code.trim().to_lowercase());
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Read a non-negative float number of seconds.
fn env_seconds(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    let value: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.clone(),
    })?;
    if !value.is_finite() {
        return Err(ConfigError::InvalidNumber { name, value: raw });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { name, value });
    }
    Ok(Some(Duration::from_secs_f64(value)))
}

/// Like `env_seconds`, but a negative value means "no delay".
fn env_delay(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env_seconds(name) {
        Err(ConfigError::Negative { .. }) => Ok(Some(Duration::ZERO)),
        other => other,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
