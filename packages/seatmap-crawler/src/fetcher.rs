//! Page fetching with timeout, retry and politeness throttling.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::CrawlerConfig;
use crate::error::{FetchError, FetchResult};
use crate::throttle::Throttle;

/// Source of page markup.
///
/// `HttpFetcher` is the network implementation; tests plug in
/// `testing::FixtureSource`.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a page and return its body text.
    async fn fetch(&self, url: &str) -> FetchResult<String>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Arc<S> {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        (**self).fetch(url).await
    }
}

/// Retry schedule: `retries` extra attempts, sleeping
/// `min(base * 2^attempt, ceiling)` before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base: Duration,
    pub ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base: Duration::from_secs(1),
            ceiling: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            retries: config.retries,
            base: config.backoff_base,
            ceiling: config.backoff_ceiling,
        }
    }

    /// Sleep before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base.saturating_mul(factor).min(self.ceiling)
    }
}

/// HTTP page fetcher.
///
/// Every attempt, retries included, passes through the shared throttle.
pub struct HttpFetcher {
    client: reqwest::Client,
    throttle: Arc<Throttle>,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Build a fetcher from configuration, sharing `throttle` with any other
    /// fetcher in the process.
    pub fn new(config: &CrawlerConfig, throttle: Arc<Throttle>) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            throttle,
            policy: RetryPolicy::from_config(config),
        })
    }

    /// Override the retry schedule.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn fetch_once(&self, url: &Url) -> FetchResult<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut attempt = 0u32;
        loop {
            self.throttle.wait().await;
            debug!(url = %parsed, attempt = attempt, "HTTP fetch starting");

            let error = match self.fetch_once(&parsed).await {
                Ok(body) => {
                    debug!(url = %parsed, bytes = body.len(), "HTTP fetch succeeded");
                    return Ok(body);
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                warn!(url = %parsed, error = %error, "HTTP fetch failed, not retrying");
                return Err(error);
            }

            if attempt >= self.policy.retries {
                warn!(url = %parsed, attempts = attempt + 1, error = %error, "HTTP fetch retries exhausted");
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt + 1,
                    last: Box::new(error),
                });
            }

            let backoff = self.policy.delay(attempt);
            warn!(
                url = %parsed,
                attempt = attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Transient fetch failure, retrying"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_fetcher(retries: u32) -> HttpFetcher {
        let config = CrawlerConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_retries(retries)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(4))
            .with_user_agent("seatmap-test/1.0");
        HttpFetcher::new(&config, Arc::new(Throttle::disabled())).unwrap()
    }

    #[test]
    fn test_backoff_schedule_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(40), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/airline/ca"))
            .and(header("user-agent", "seatmap-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fast_fetcher(0)
            .fetch(&format!("{}/airline/ca", server.uri()))
            .await
            .unwrap();

        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_retries_transient_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let body = fast_fetcher(2).fetch(&server.uri()).await.unwrap();

        assert_eq!(body, "recovered");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = fast_fetcher(2).fetch(&server.uri()).await.unwrap_err();

        match err {
            FetchError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Status { status, .. } if status.as_u16() == 500));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fast_fetcher(3).fetch(&server.uri()).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn test_rate_limited_response_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("after throttle"))
            .mount(&server)
            .await;

        let body = fast_fetcher(1).fetch(&server.uri()).await.unwrap();

        assert_eq!(body, "after throttle");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_timeouts_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("too late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = CrawlerConfig::default()
            .with_timeout(Duration::from_millis(100))
            .with_retries(1)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(4));
        let fetcher = HttpFetcher::new(&config, Arc::new(Throttle::disabled())).unwrap();

        let err = fetcher.fetch(&server.uri()).await.unwrap_err();

        match err {
            FetchError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, FetchError::Transport { ref source, .. } if source.is_timeout()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = fast_fetcher(2)
            .fetch(&format!("http://127.0.0.1:{port}/airline/ca"))
            .await
            .unwrap_err();

        match err {
            FetchError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Transport { ref source, .. } if source.is_connect()));
                assert!(last.is_transient());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_url_fails_immediately() {
        let err = fast_fetcher(3).fetch("not a url").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert!(!err.is_transient());
    }
}
