//! JobScout Crawler - the listing crawl loop.
//!
//! Fetches listing pages, extracts job items with one of two strategies,
//! completes each item with its detail page, and streams assembled records
//! to a sink. Pagination is bounded by `crawl.max_pages` and confined to the
//! site's allowed domains.
//!
//! # Features
//!
//! - HTTP (reqwest) and headless browser (chromiumoxide) fetchers behind one trait
//! - Declarative selector rules with sentinel fallback
//! - Concurrent detail fetches that keep crawl order
//! - JSON lines, JSON array and console sinks plus an error-log artifact
//!
//! # Example
//!
//! ```rust,no_run
//! use jobscout_core::{CrawlConfig, FetchConfig, SiteId};
//! use jobscout_crawler::{CrawlOrchestrator, HttpFetcher, JsonLinesSink, SelectorExtractor, SiteRules};
//! use jobscout_site::SiteLoader;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = SiteLoader::with_default_dir()?;
//! let site = Arc::new(loader.load(&SiteId::new("jobstreet-ph")?)?);
//! let rules = Arc::new(SiteRules::compile(&site)?);
//! let crawl = CrawlConfig::default();
//!
//! let orchestrator = CrawlOrchestrator::new(
//!     site,
//!     rules.clone(),
//!     Arc::new(HttpFetcher::new(&FetchConfig::default())?),
//!     Arc::new(SelectorExtractor::new(rules, crawl.max_items_per_page)),
//! )
//! .with_crawl_config(&crawl);
//!
//! let mut sink = JsonLinesSink::create("jobs.jsonl");
//! let report = orchestrator.run(&mut sink).await?;
//! println!("{} records from {} pages", report.records_written, report.pages_processed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod assembler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod paginator;
pub mod parser;
pub mod sink;
pub mod strategy;

// Re-export commonly used types
pub use assembler::assemble;
pub use error::{CrawlError, FetchError, Result};
pub use extractor::{CompiledRule, CompiledRules, SiteRules};
pub use fetcher::{
    fetch_with_retry, BrowserFetcher, Document, Fetcher, HttpFetcher, RetryPolicy, StaticFetcher,
};
pub use orchestrator::{CrawlOrchestrator, CrawlReport};
pub use paginator::{CrawlSession, PageDecision, StopReason};
pub use parser::{parse_detail_salary, parse_listing, ListingPage};
pub use sink::{
    ConsoleSink, DeferredFile, ErrorArtifact, JsonArraySink, JsonLinesSink, MultiSink, RecordSink,
};
pub use strategy::{ExtractedItem, JobExtractor, LlmExtractor, PageExtraction, SelectorExtractor};
