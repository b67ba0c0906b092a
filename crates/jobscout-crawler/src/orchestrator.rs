//! Crawl orchestrator.
//!
//! Drives one run: fetch a listing page, extract its items, complete each
//! item (detail fetch for the salary when needed), hand the records to the
//! sink in page order, then ask the [`CrawlSession`] whether to continue.

use crate::assembler::assemble;
use crate::error::{FetchError, Result};
use crate::extractor::SiteRules;
use crate::fetcher::{fetch_with_retry, Fetcher, RetryPolicy};
use crate::paginator::{CrawlSession, PageDecision, StopReason};
use crate::parser::parse_detail_salary;
use crate::sink::RecordSink;
use crate::strategy::{ExtractedItem, JobExtractor};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use jobscout_core::{CrawlConfig, JobRecord, JobSummary, RunId};
use jobscout_llm::Usage;
use jobscout_site::SiteDefinition;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// How an item's salary was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailStatus {
    Fetched,
    Failed,
    Skipped,
    NotNeeded,
}

struct ItemOutcome {
    record: JobRecord,
    detail: DetailStatus,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Run identifier
    pub run_id: RunId,
    /// Site that was crawled
    pub site_id: String,
    /// Extraction strategy name
    pub extractor: &'static str,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Listing pages fetched and extracted
    pub pages_processed: u32,
    /// Continuation pages requested after the start page
    pub continuations: u32,
    /// Records handed to the sink
    pub records_written: usize,
    /// Detail pages fetched successfully
    pub details_fetched: usize,
    /// Detail fetches that failed (salary left as sentinel)
    pub details_failed: usize,
    /// Items without a usable or allowed detail link
    pub details_skipped: usize,
    /// Listing pages that could not be fetched
    pub failed_pages: Vec<FetchError>,
    /// Why pagination ended
    pub stop_reason: StopReason,
    /// Model token usage, for LLM runs
    pub llm_usage: Option<Usage>,
}

impl CrawlReport {
    fn new(run_id: RunId, site_id: &str, extractor: &'static str) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            site_id: site_id.to_string(),
            extractor,
            started_at: now,
            finished_at: now,
            pages_processed: 0,
            continuations: 0,
            records_written: 0,
            details_fetched: 0,
            details_failed: 0,
            details_skipped: 0,
            failed_pages: Vec::new(),
            stop_reason: StopReason::NoNextLink,
            llm_usage: None,
        }
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// The start page's fetch error, when the run never got past it.
    #[must_use]
    pub fn start_page_failure(&self) -> Option<&FetchError> {
        if self.pages_processed > 0 {
            return None;
        }
        self.failed_pages.first()
    }
}

/// Runs crawls for one site.
pub struct CrawlOrchestrator {
    site: Arc<SiteDefinition>,
    rules: Arc<SiteRules>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn JobExtractor>,
    max_pages: u32,
    concurrent_requests: usize,
    page_delay: Duration,
    retry: RetryPolicy,
}

impl CrawlOrchestrator {
    /// Create an orchestrator with the default crawl settings.
    #[must_use]
    pub fn new(
        site: Arc<SiteDefinition>,
        rules: Arc<SiteRules>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn JobExtractor>,
    ) -> Self {
        Self {
            site,
            rules,
            fetcher,
            extractor,
            max_pages: 0,
            concurrent_requests: 1,
            page_delay: Duration::ZERO,
            retry: RetryPolicy::none(),
        }
        .with_crawl_config(&CrawlConfig::default())
    }

    /// Apply page limit, concurrency and delay from the `[crawl]` section.
    #[must_use]
    pub fn with_crawl_config(mut self, config: &CrawlConfig) -> Self {
        self.max_pages = config.max_pages;
        self.concurrent_requests = config.concurrent_requests.max(1);
        self.page_delay = Duration::from_millis(config.page_delay_ms);
        self
    }

    /// Override the continuation limit.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the retry policy for listing and detail fetches.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Crawl from the site's start URL, writing every record to `sink`.
    ///
    /// A listing page that cannot be fetched ends pagination and is recorded
    /// in the report. `sink` is finished only when at least one listing page
    /// was processed, so a run that never got past the start page leaves
    /// existing output alone.
    ///
    /// Extraction failures end the run with an error. Records written before
    /// the failure are finished into `sink` first; when there are none, `sink`
    /// is not finished.
    pub async fn run(&self, sink: &mut dyn RecordSink) -> Result<CrawlReport> {
        let start = Url::parse(self.site.start_url()).map_err(|e| FetchError::InvalidUrl {
            url: self.site.start_url().to_string(),
            reason: e.to_string(),
        })?;

        let mut session = CrawlSession::new(self.max_pages);
        let mut report = CrawlReport::new(
            *session.run_id(),
            self.site.id().as_str(),
            self.extractor.name(),
        );

        info!(
            run_id = %report.run_id,
            site = %self.site.id(),
            extractor = report.extractor,
            max_pages = self.max_pages,
            url = %start,
            "starting crawl"
        );

        let mut current = start;
        loop {
            if session.pages_followed() > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            debug!(run_id = %report.run_id, page = report.pages_processed + 1, url = %current, "fetching listing page");
            let page = match fetch_with_retry(self.fetcher.as_ref(), &current, self.retry).await {
                Ok(page) => page,
                Err(error) => {
                    warn!(run_id = %report.run_id, url = %current, error = %error, "listing page failed");
                    report.failed_pages.push(error);
                    report.stop_reason = StopReason::PageFailed;
                    break;
                }
            };
            report.pages_processed += 1;

            let extraction = match self.extractor.extract_page(&page).await {
                Ok(extraction) => extraction,
                Err(error) => {
                    warn!(run_id = %report.run_id, url = %page.url, error = %error, "extraction failed");
                    if report.records_written > 0 {
                        info!(
                            run_id = %report.run_id,
                            records = report.records_written,
                            "keeping records written before the failure"
                        );
                        if let Err(finish_error) = sink.finish() {
                            warn!(error = %finish_error, "failed to finish partial output");
                        }
                    }
                    return Err(error);
                }
            };
            if extraction.items.is_empty() {
                info!(run_id = %report.run_id, url = %page.url, "no job items on page");
            }
            self.process_items(extraction.items, sink, &mut report).await?;

            match session.next_page(&page.url, extraction.next_href.as_deref(), &self.site) {
                PageDecision::Continue(next) => current = next,
                PageDecision::Stop(reason) => {
                    report.stop_reason = reason;
                    break;
                }
            }
        }

        if report.pages_processed > 0 {
            sink.finish()?;
        }

        report.continuations = session.pages_followed();
        report.llm_usage = self.extractor.usage();
        report.finished_at = Utc::now();

        info!(
            run_id = %report.run_id,
            pages = report.pages_processed,
            records = report.records_written,
            details_fetched = report.details_fetched,
            details_failed = report.details_failed,
            stop_reason = %report.stop_reason,
            "crawl finished"
        );

        Ok(report)
    }

    async fn process_items(
        &self,
        items: Vec<ExtractedItem>,
        sink: &mut dyn RecordSink,
        report: &mut CrawlReport,
    ) -> Result<()> {
        let mut outcomes = stream::iter(items.into_iter().map(|item| self.complete_item(item)))
            .buffered(self.concurrent_requests);

        while let Some(outcome) = outcomes.next().await {
            match outcome.detail {
                DetailStatus::Fetched => report.details_fetched += 1,
                DetailStatus::Failed => report.details_failed += 1,
                DetailStatus::Skipped => report.details_skipped += 1,
                DetailStatus::NotNeeded => {}
            }
            sink.write(&outcome.record)?;
            report.records_written += 1;
        }

        Ok(())
    }

    async fn complete_item(&self, item: ExtractedItem) -> ItemOutcome {
        match item {
            ExtractedItem::Complete(record) => ItemOutcome {
                record,
                detail: DetailStatus::NotNeeded,
            },
            ExtractedItem::Summary(summary) => self.complete_summary(summary).await,
        }
    }

    async fn complete_summary(&self, summary: JobSummary) -> ItemOutcome {
        if self.rules.salary.is_empty() {
            return ItemOutcome {
                record: assemble(summary, None),
                detail: DetailStatus::NotNeeded,
            };
        }

        let detail_url = Url::parse(&summary.url)
            .ok()
            .filter(|url| self.site.is_allowed(url));
        let Some(detail_url) = detail_url else {
            debug!(url = %summary.url, "no fetchable detail link, salary not listed");
            return ItemOutcome {
                record: assemble(summary, None),
                detail: DetailStatus::Skipped,
            };
        };

        match fetch_with_retry(self.fetcher.as_ref(), &detail_url, self.retry).await {
            Ok(page) => {
                let salary = parse_detail_salary(&self.rules, &page.body);
                ItemOutcome {
                    record: assemble(summary, salary),
                    detail: DetailStatus::Fetched,
                }
            }
            Err(error) => {
                warn!(url = %detail_url, error = %error, "detail fetch failed, salary not listed");
                ItemOutcome {
                    record: assemble(summary, None),
                    detail: DetailStatus::Failed,
                }
            }
        }
    }
}
