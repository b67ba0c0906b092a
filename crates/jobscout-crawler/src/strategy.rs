//! Extraction strategies.
//!
//! Both strategies turn a fetched listing page into items plus an optional
//! next-page link. [`SelectorExtractor`] yields summaries that still need a
//! detail fetch for the salary; [`LlmExtractor`] yields finished records.

use crate::error::{CrawlError, Result};
use crate::extractor::SiteRules;
use crate::fetcher::Document;
use crate::parser::{parse_listing, parse_next_href};
use async_trait::async_trait;
use jobscout_core::{JobRecord, JobSummary};
use jobscout_llm::{JobExtractionPass, LlmError, Usage};
use std::sync::{Arc, Mutex};
use tracing::info;

/// One item read from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedItem {
    /// Listing fields only; salary comes from the detail page
    Summary(JobSummary),
    /// A finished record
    Complete(JobRecord),
}

/// Items and pagination read from one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtraction {
    /// Items in page order
    pub items: Vec<ExtractedItem>,
    /// Raw next-page link
    pub next_href: Option<String>,
}

/// Turns listing pages into job items.
#[async_trait]
pub trait JobExtractor: Send + Sync {
    /// Extract every item from one listing page.
    async fn extract_page(&self, page: &Document) -> Result<PageExtraction>;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Token usage so far, for strategies that call a model.
    fn usage(&self) -> Option<Usage> {
        None
    }
}

/// Selector-rule strategy.
pub struct SelectorExtractor {
    rules: Arc<SiteRules>,
    max_items: Option<usize>,
}

impl SelectorExtractor {
    /// Read at most `max_items` items per page when given.
    #[must_use]
    pub fn new(rules: Arc<SiteRules>, max_items: Option<usize>) -> Self {
        Self { rules, max_items }
    }
}

#[async_trait]
impl JobExtractor for SelectorExtractor {
    async fn extract_page(&self, page: &Document) -> Result<PageExtraction> {
        let listing = parse_listing(&self.rules, &page.body, &page.url, self.max_items);
        Ok(PageExtraction {
            items: listing
                .summaries
                .into_iter()
                .map(ExtractedItem::Summary)
                .collect(),
            next_href: listing.next_href,
        })
    }

    fn name(&self) -> &'static str {
        "selector"
    }
}

/// LLM strategy; pagination still uses the site's next-page rules.
pub struct LlmExtractor {
    pass: JobExtractionPass,
    rules: Arc<SiteRules>,
    usage: Mutex<Usage>,
}

impl LlmExtractor {
    /// Wrap an extraction pass.
    #[must_use]
    pub fn new(pass: JobExtractionPass, rules: Arc<SiteRules>) -> Self {
        Self {
            pass,
            rules,
            usage: Mutex::new(Usage::default()),
        }
    }
}

#[async_trait]
impl JobExtractor for LlmExtractor {
    async fn extract_page(&self, page: &Document) -> Result<PageExtraction> {
        let outcome = self
            .pass
            .extract(&page.body, &page.url)
            .await
            .map_err(|e| map_llm_error(page, e))?;

        let total = {
            let mut usage = self.usage.lock().expect("acquire usage lock");
            usage.accumulate(outcome.usage);
            *usage
        };

        info!(
            url = %page.url,
            records = outcome.records.len(),
            requests = outcome.requests,
            input_tokens = outcome.usage.input_tokens,
            output_tokens = outcome.usage.output_tokens,
            total_tokens = total.total_tokens(),
            "LLM extraction finished for page"
        );

        Ok(PageExtraction {
            items: outcome
                .records
                .into_iter()
                .map(ExtractedItem::Complete)
                .collect(),
            next_href: parse_next_href(&self.rules, &page.body),
        })
    }

    fn name(&self) -> &'static str {
        "llm"
    }

    fn usage(&self) -> Option<Usage> {
        Some(*self.usage.lock().expect("acquire usage lock"))
    }
}

fn map_llm_error(page: &Document, error: LlmError) -> CrawlError {
    match error {
        LlmError::InvalidOutput { message, raw } => CrawlError::Parse {
            url: page.url.to_string(),
            message,
            raw,
        },
        source => CrawlError::Llm {
            url: page.url.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn document(body: &str) -> Document {
        Document {
            url: Url::parse("https://ph.jobstreet.com/jobs/").expect("valid url"),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_invalid_output_maps_to_parse_error() {
        let err = map_llm_error(
            &document(""),
            LlmError::InvalidOutput {
                message: "expected value".to_string(),
                raw: "not json".to_string(),
            },
        );
        assert_eq!(err.raw_output(), Some("not json"));
        assert_eq!(err.url(), Some("https://ph.jobstreet.com/jobs/"));
    }

    #[test]
    fn test_provider_errors_map_to_llm_error() {
        let err = map_llm_error(
            &document(""),
            LlmError::RateLimitExceeded {
                provider: "openai".to_string(),
                message: "slow down".to_string(),
            },
        );
        assert!(matches!(err, CrawlError::Llm { .. }));
        assert!(err.raw_output().is_none());
    }
}
