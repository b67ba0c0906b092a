use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::Page;
use futures::StreamExt;
use jobscout_core::BrowserConfig;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Rendered page returned by the browser.
#[derive(Debug, Clone)]
pub struct PageContent {
    /// URL after redirects
    pub final_url: String,
    /// Serialized DOM
    pub html: String,
}

/// Headless Chromium session.
///
/// Each fetch opens a fresh tab and closes it afterwards, so one engine can
/// serve concurrent fetches.
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch Chromium with a random desktop fingerprint and default settings.
    pub async fn new() -> Result<Self> {
        let config = BrowserConfig {
            randomize_fingerprint: true,
            ..BrowserConfig::default()
        };
        Self::with_config(&config, &FingerprintConfig::randomized().user_agent).await
    }

    /// Launch Chromium according to `config`.
    pub async fn with_config(config: &BrowserConfig, user_agent: &str) -> Result<Self> {
        let fingerprint = FingerprintConfig::from_config(config, user_agent);

        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .request_timeout(Duration::from_secs(config.navigation_timeout_secs));
        if !config.headless {
            builder = builder.with_head();
        }

        let chromium_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    trace!(error = %e, "browser handler event error");
                }
            }
        });

        debug!(
            headless = config.headless,
            user_agent = %fingerprint.user_agent,
            "launched browser"
        );

        Ok(Self {
            browser,
            handler,
            fingerprint,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// Identity this session presents.
    #[must_use]
    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    /// Navigate to `url` and return the rendered HTML.
    ///
    /// When `wait_for` is given, the page is read only once an element
    /// matching it exists. The whole operation is bounded by the navigation
    /// timeout.
    pub async fn fetch_page_content(&self, url: &str, wait_for: Option<&str>) -> Result<PageContent> {
        url::Url::parse(url).map_err(|_| BrowserError::InvalidUrl(url.to_string()))?;

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| navigation_error(url, &e))?;

        let result = tokio::time::timeout(self.navigation_timeout, self.load(&page, url, wait_for))
            .await
            .unwrap_or_else(|_| {
                Err(BrowserError::Timeout {
                    url: url.to_string(),
                    seconds: self.navigation_timeout.as_secs(),
                })
            });

        if let Err(e) = page.close().await {
            warn!(url = %url, error = %e, "failed to close browser tab");
        }

        result
    }

    async fn load(&self, page: &Page, url: &str, wait_for: Option<&str>) -> Result<PageContent> {
        page.execute(SetUserAgentOverrideParams {
            user_agent: self.fingerprint.user_agent.clone(),
            accept_language: None,
            platform: None,
            user_agent_metadata: None,
        })
        .await
        .map_err(|e| navigation_error(url, &e))?;

        page.goto(url).await.map_err(|e| navigation_error(url, &e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| navigation_error(url, &e))?;

        if let Some(selector) = wait_for {
            wait_for_selector(page, url, selector, self.navigation_timeout).await?;
        }

        let html = page.content().await.map_err(|e| navigation_error(url, &e))?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        debug!(url = %url, final_url = %final_url, bytes = html.len(), "rendered page");

        Ok(PageContent { final_url, html })
    }

    /// Close the browser and stop its event loop.
    pub async fn close(mut self) -> Result<()> {
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()));
        self.handler.abort();
        result
    }
}

async fn wait_for_selector(page: &Page, url: &str, selector: &str, limit: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + limit;

    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(BrowserError::SelectorNotFound {
                url: url.to_string(),
                selector: selector.to_string(),
            });
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

fn navigation_error(url: &str, error: &impl std::fmt::Display) -> BrowserError {
    BrowserError::NavigationError {
        url: url.to_string(),
        message: error.to_string(),
    }
}
