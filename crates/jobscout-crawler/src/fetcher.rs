//! Page fetchers.
//!
//! [`Fetcher`] is the seam between the crawl loop and the network:
//! [`HttpFetcher`] issues plain GET requests, [`BrowserFetcher`] renders
//! pages in headless Chromium and [`StaticFetcher`] serves fixed pages from
//! memory.

use crate::error::{CrawlError, FetchError, Result};
use async_trait::async_trait;
use jobscout_browser::{BrowserEngine, BrowserError};
use jobscout_core::FetchConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A fetched page.
#[derive(Debug, Clone)]
pub struct Document {
    /// URL after redirects; relative links resolve against it
    pub url: Url,
    /// Raw response body
    pub body: String,
}

/// Retrieves pages by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one page.
    async fn fetch(&self, url: &Url) -> std::result::Result<Document, FetchError>;
}

/// Plain HTTP fetcher.
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Build a client with the configured user agent, headers and timeout.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CrawlError::Config(format!("invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| CrawlError::Config(format!("invalid value for header '{name}': {e}")))?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CrawlError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    fn transport_error(&self, url: &Url, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Document, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        debug!(url = %url, status = status.as_u16(), bytes = body.len(), "fetched page");

        Ok(Document {
            url: final_url,
            body,
        })
    }
}

/// Fetcher backed by a headless browser session.
pub struct BrowserFetcher {
    engine: Arc<BrowserEngine>,
    wait_for: Option<String>,
}

impl BrowserFetcher {
    /// Wrap a running engine.
    #[must_use]
    pub fn new(engine: Arc<BrowserEngine>) -> Self {
        Self {
            engine,
            wait_for: None,
        }
    }

    /// Wait for `selector` before reading each page.
    #[must_use]
    pub fn with_wait_for(mut self, selector: Option<String>) -> Self {
        self.wait_for = selector;
        self
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Document, FetchError> {
        let page = self
            .engine
            .fetch_page_content(url.as_str(), self.wait_for.as_deref())
            .await
            .map_err(|e| browser_fetch_error(url, e))?;

        let final_url = Url::parse(&page.final_url).unwrap_or_else(|_| url.clone());

        Ok(Document {
            url: final_url,
            body: page.html,
        })
    }
}

fn browser_fetch_error(url: &Url, error: BrowserError) -> FetchError {
    match error {
        BrowserError::Timeout { seconds, .. } => FetchError::Timeout {
            url: url.to_string(),
            seconds,
        },
        BrowserError::InvalidUrl(_) => FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "rejected by browser".to_string(),
        },
        other => FetchError::Browser {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

/// Serves fixed responses from memory and records every request.
///
/// Unknown URLs answer with HTTP 404.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, std::result::Result<String, FetchError>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    #[must_use]
    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(normalize(url), Ok(body.into()));
        self
    }

    /// Fail requests for `url` with `error`.
    #[must_use]
    pub fn with_error(mut self, url: &str, error: FetchError) -> Self {
        self.pages.insert(normalize(url), Err(error));
        self
    }

    /// Every URL requested so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("acquire request log lock").clone()
    }

    /// How many times `url` was requested.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        let url = normalize(url);
        self.requests
            .lock()
            .expect("acquire request log lock")
            .iter()
            .filter(|requested| **requested == url)
            .count()
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), String::from)
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<Document, FetchError> {
        self.requests
            .lock()
            .expect("acquire request log lock")
            .push(url.to_string());

        match self.pages.get(url.as_str()) {
            Some(Ok(body)) => Ok(Document {
                url: url.clone(),
                body: body.clone(),
            }),
            Some(Err(error)) => Err(error.clone()),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// How transient fetch failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `delay * n`
    pub delay: Duration,
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }

    /// Policy from the `[fetch]` config section.
    #[must_use]
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Fetch `url`, retrying transient failures with linear backoff.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &Url,
    policy: RetryPolicy,
) -> std::result::Result<Document, FetchError> {
    let mut attempt = 0;

    loop {
        match fetcher.fetch(url).await {
            Ok(document) => return Ok(document),
            Err(error) if error.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay * attempt;
                warn!(
                    url = %url,
                    attempt,
                    max_retries = policy.max_retries,
                    delay = ?delay,
                    error = %error,
                    "fetch failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
