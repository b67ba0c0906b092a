//! Error types for the crawl loop.

use thiserror::Error;

/// A failed page request. Every variant names the URL it concerns.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// Connection, TLS or body-read failure
    #[error("network error fetching {url}: {message}")]
    Network {
        /// Requested URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// Request exceeded its timeout
    #[error("timed out after {seconds}s fetching {url}")]
    Timeout {
        /// Requested URL
        url: String,
        /// Timeout that elapsed
        seconds: u64,
    },

    /// Headless browser failed to render the page
    #[error("browser failed on {url}: {message}")]
    Browser {
        /// Requested URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// URL could not be parsed or is not absolute
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending URL text
        url: String,
        /// Why it was rejected
        reason: String,
    },
}

impl FetchError {
    /// URL the failed request was for.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. }
            | Self::Network { url, .. }
            | Self::Timeout { url, .. }
            | Self::Browser { url, .. }
            | Self::InvalidUrl { url, .. } => url,
        }
    }

    /// Whether retrying the same request might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Browser { .. } | Self::InvalidUrl { .. } => false,
        }
    }
}

/// Errors that end a crawl run.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A request failed where the crawl cannot degrade
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Model output was not valid job JSON
    #[error("could not parse extracted jobs for {url}: {message}")]
    Parse {
        /// Page the output was produced for
        url: String,
        /// Parser message
        message: String,
        /// Raw model output
        raw: String,
    },

    /// LLM provider failure (auth, rate limit, API status, network)
    #[error("LLM extraction failed for {url}: {source}")]
    Llm {
        /// Page being extracted
        url: String,
        /// Provider error
        #[source]
        source: jobscout_llm::LlmError,
    },

    /// Writing records failed
    #[error("failed to write records to {path}: {source}")]
    Sink {
        /// Output path
        path: String,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// A selector rule does not compile
    #[error("invalid selector '{rule}': {reason}")]
    Selector {
        /// Rule text
        rule: String,
        /// Compiler message
        reason: String,
    },

    /// Site definition problem
    #[error("site definition error: {0}")]
    Site(#[from] jobscout_site::SiteError),

    /// Fetcher could not be set up
    #[error("configuration error: {0}")]
    Config(String),

    /// Record serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CrawlError {
    /// URL the error concerns, when there is one.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Fetch(e) => Some(e.url()),
            Self::Parse { url, .. } | Self::Llm { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Raw content that failed to parse, when there is any.
    #[must_use]
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Result type for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_carries_url() {
        let err = FetchError::Status {
            url: "https://ph.jobstreet.com/job/1".to_string(),
            status: 404,
        };
        assert_eq!(err.url(), "https://ph.jobstreet.com/job/1");
        assert_eq!(err.to_string(), "HTTP 404 fetching https://ph.jobstreet.com/job/1");
    }

    #[test]
    fn test_transient_classification() {
        let status = |status| FetchError::Status {
            url: "u".to_string(),
            status,
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(FetchError::Timeout {
            url: "u".to_string(),
            seconds: 30
        }
        .is_transient());
        assert!(!FetchError::InvalidUrl {
            url: "u".to_string(),
            reason: "relative".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_crawl_error_accessors() {
        let err = CrawlError::Parse {
            url: "https://ph.jobstreet.com/jobs/".to_string(),
            message: "expected value".to_string(),
            raw: "not json".to_string(),
        };
        assert_eq!(err.url(), Some("https://ph.jobstreet.com/jobs/"));
        assert_eq!(err.raw_output(), Some("not json"));

        let err = CrawlError::Config("bad header".to_string());
        assert!(err.url().is_none());
        assert!(err.raw_output().is_none());
    }
}
