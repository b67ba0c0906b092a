//! Browser error types.

use thiserror::Error;

/// Result type for browser operations.
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Errors raised while driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Chromium could not be configured or launched
    #[error("chromium error: {0}")]
    ChromiumError(String),

    /// Navigation or page interaction failed
    #[error("navigation to {url} failed: {message}")]
    NavigationError {
        /// Requested URL
        url: String,
        /// Underlying CDP error
        message: String,
    },

    /// A wait-for selector never appeared
    #[error("selector '{selector}' not found on {url}")]
    SelectorNotFound {
        /// Requested URL
        url: String,
        /// Selector that was awaited
        selector: String,
    },

    /// Page did not finish within the navigation timeout
    #[error("timed out after {seconds}s loading {url}")]
    Timeout {
        /// Requested URL
        url: String,
        /// Timeout that elapsed
        seconds: u64,
    },

    /// URL could not be parsed
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
}

impl BrowserError {
    /// URL the error relates to, when there is one.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::NavigationError { url, .. }
            | Self::SelectorNotFound { url, .. }
            | Self::Timeout { url, .. } => Some(url),
            Self::InvalidUrl(url) => Some(url),
            Self::ChromiumError(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::Timeout {
            url: "https://example.com/jobs".to_string(),
            seconds: 120,
        };
        assert_eq!(
            err.to_string(),
            "timed out after 120s loading https://example.com/jobs"
        );
        assert_eq!(err.url(), Some("https://example.com/jobs"));
    }

    #[test]
    fn test_chromium_error_has_no_url() {
        let err = BrowserError::ChromiumError("no executable".to_string());
        assert!(err.url().is_none());
        assert!(err.to_string().contains("no executable"));
    }
}
