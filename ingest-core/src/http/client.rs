//! Fetcher trait and implementations.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::config::{FetchConfig, RETRY_STATUSES};
use crate::error::FetchError;
use crate::types::{FailureKind, FetchFailure, RawPage};

use super::charset::decode_body;
use super::rate_limiter::RateLimiter;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_VI: &str = "vi,en-US;q=0.7,en;q=0.3";

/// Source of raw pages, mockable in tests.
///
/// Any HTTP response, including 4xx and 5xx, is a `RawPage`. Only attempts
/// that never produced a response are a `FetchFailure`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchFailure>;
}

/// Builder for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherBuilder {
    config: FetchConfig,
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcherBuilder {
    /// Start from [`FetchConfig::from_env`].
    pub fn new() -> Self {
        Self {
            config: FetchConfig::from_env(),
        }
    }

    pub fn config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Minimum delay between requests to one host. Zero disables it.
    pub fn rate_limit(mut self, delay: Duration) -> Self {
        self.config.rate_limit = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.config.retry_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<HttpFetcher, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VI));

        let inner = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(HttpFetcher {
            inner,
            rate_limiter: RateLimiter::new(self.config.rate_limit),
            max_retries: self.config.max_retries,
            retry_backoff: self.config.retry_backoff,
        })
    }
}

/// Production fetcher with per-host rate limiting and retries.
pub struct HttpFetcher {
    inner: reqwest::Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpFetcher {
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::new()
    }

    /// One GET without retries. `requested` is the caller's URL string, kept
    /// verbatim so a page is keyed the same way as a failed attempt.
    async fn fetch_once(&self, requested: &str, url: &Url) -> Result<RawPage, reqwest::Error> {
        if let Some(host) = url.host_str() {
            self.rate_limiter.wait(host).await;
        }

        let response = self.inner.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?;

        tracing::debug!(url = %url, status, final_url = %final_url, "network: fetched");
        Ok(RawPage {
            requested_url: requested.to_string(),
            redirected: final_url != *url,
            final_url: final_url.to_string(),
            http_status: status,
            html_body: decode_body(&bytes, content_type.as_deref()),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchFailure> {
        let parsed = Url::parse(url).map_err(|e| FetchFailure {
            requested_url: url.to_string(),
            kind: FailureKind::Other,
            message: format!("invalid URL: {}", e),
        })?;

        let mut attempt = 0;
        loop {
            let outcome = self.fetch_once(url, &parsed).await.map_err(|e| FetchFailure {
                requested_url: url.to_string(),
                kind: classify_transport_error(&e),
                message: e.to_string(),
            });

            let retry_reason = match &outcome {
                Ok(page) if RETRY_STATUSES.contains(&page.http_status) => {
                    Some(format!("http_{}", page.http_status))
                }
                Ok(_) => None,
                Err(failure) => Some(failure.kind.code().to_string()),
            };
            let Some(retry_reason) = retry_reason else {
                return outcome;
            };
            if attempt >= self.max_retries {
                return outcome;
            }
            attempt += 1;
            let delay = self.retry_backoff * attempt;
            tracing::warn!(
                url,
                attempt,
                reason = %retry_reason,
                delay_ms = delay.as_millis() as u64,
                "retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Map a reqwest error onto the coarse transport failure kinds.
pub fn classify_transport_error(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        return FailureKind::Timeout;
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(inner) = source {
        let text = inner.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return FailureKind::Dns;
        }
        if let Some(io_err) = inner.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::TimedOut => return FailureKind::Timeout,
                io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::ConnectionRefused
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => return FailureKind::ConnectionLost,
                _ => {}
            }
        }
        source = inner.source();
    }

    if err.is_connect() || err.is_body() {
        FailureKind::ConnectionLost
    } else {
        FailureKind::Other
    }
}

/// Canned outcome for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Page {
        status: u16,
        final_url: Option<String>,
        html: String,
    },
    Failure(FailureKind),
}

/// In-memory fetcher for tests. Unknown URLs fail with `FailureKind::Other`.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// 200 response served from `url` itself.
    pub fn with_html(self, url: &str, html: &str) -> Self {
        self.with_status(url, 200, html)
    }

    pub fn with_status(self, url: &str, status: u16, html: &str) -> Self {
        self.with_response(
            url,
            MockResponse::Page {
                status,
                final_url: None,
                html: html.to_string(),
            },
        )
    }

    /// 200 response reached after redirecting to `final_url`.
    pub fn with_redirect(self, url: &str, final_url: &str, html: &str) -> Self {
        self.with_response(
            url,
            MockResponse::Page {
                status: 200,
                final_url: Some(final_url.to_string()),
                html: html.to_string(),
            },
        )
    }

    pub fn with_failure(self, url: &str, kind: FailureKind) -> Self {
        self.with_response(url, MockResponse::Failure(kind))
    }

    /// URLs fetched so far, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<RawPage, FetchFailure> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        match self.responses.get(url) {
            Some(MockResponse::Page {
                status,
                final_url,
                html,
            }) => Ok(RawPage {
                requested_url: url.to_string(),
                final_url: final_url.clone().unwrap_or_else(|| url.to_string()),
                http_status: *status,
                redirected: final_url.as_deref().is_some_and(|f| f != url),
                html_body: html.clone(),
            }),
            Some(MockResponse::Failure(kind)) => Err(FetchFailure {
                requested_url: url.to_string(),
                kind: *kind,
                message: format!("mock {}", kind.code()),
            }),
            None => Err(FetchFailure {
                requested_url: url.to_string(),
                kind: FailureKind::Other,
                message: format!("No mock response for URL: {}", url),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_pages_and_failures() {
        let fetcher = MockFetcher::new()
            .with_html("https://a/1", "<title>one</title>")
            .with_status("https://a/2", 404, "gone")
            .with_redirect("https://a/3", "https://a/home", "<title>home</title>")
            .with_failure("https://a/4", FailureKind::Dns);

        let page = fetcher.fetch("https://a/1").await.unwrap();
        assert_eq!(page.http_status, 200);
        assert!(!page.redirected);
        assert_eq!(page.final_url, "https://a/1");

        assert_eq!(fetcher.fetch("https://a/2").await.unwrap().http_status, 404);

        let redirected = fetcher.fetch("https://a/3").await.unwrap();
        assert!(redirected.redirected);
        assert_eq!(redirected.final_url, "https://a/home");

        let failure = fetcher.fetch("https://a/4").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Dns);

        let unknown = fetcher.fetch("https://a/5").await.unwrap_err();
        assert_eq!(unknown.kind, FailureKind::Other);

        assert_eq!(fetcher.requests().len(), 5);
    }

    #[tokio::test]
    async fn invalid_url_is_a_transport_failure() {
        let fetcher = HttpFetcher::builder()
            .rate_limit(Duration::ZERO)
            .max_retries(0)
            .build()
            .unwrap();
        let failure = fetcher.fetch("not a url").await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Other);
        assert_eq!(failure.requested_url, "not a url");
    }
}
