//! Bounded pagination.

use crate::parser::resolve_link;
use jobscout_core::RunId;
use jobscout_site::SiteDefinition;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};
use url::Url;

/// Why a crawl stopped following listing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The page had no next-page control
    NoNextLink,
    /// `max_pages` continuations were already followed
    MaxPagesReached,
    /// The next link leaves the allowed domains
    Offsite,
    /// The next link could not be resolved to an http(s) URL
    InvalidLink,
    /// A listing page could not be fetched
    PageFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NoNextLink => "no next page",
            Self::MaxPagesReached => "page limit reached",
            Self::Offsite => "next page is offsite",
            Self::InvalidLink => "next page link is invalid",
            Self::PageFailed => "listing page failed",
        };
        f.write_str(reason)
    }
}

/// Outcome of the pagination decision for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDecision {
    /// Fetch this listing page next
    Continue(Url),
    /// Stop crawling
    Stop(StopReason),
}

/// Per-run pagination state, owned by the crawl loop.
#[derive(Debug, Clone)]
pub struct CrawlSession {
    run_id: RunId,
    pages_followed: u32,
    max_pages: u32,
}

impl CrawlSession {
    /// New session allowing `max_pages` continuation requests.
    #[must_use]
    pub fn new(max_pages: u32) -> Self {
        Self {
            run_id: RunId::generate(),
            pages_followed: 0,
            max_pages,
        }
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Continuation requests issued so far.
    #[must_use]
    pub fn pages_followed(&self) -> u32 {
        self.pages_followed
    }

    /// Continuation limit.
    #[must_use]
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Decide whether to follow `next_href` from the page at `current`.
    ///
    /// The counter only advances on [`PageDecision::Continue`], so a next
    /// control that never disappears still stops after `max_pages`.
    pub fn next_page(
        &mut self,
        current: &Url,
        next_href: Option<&str>,
        site: &SiteDefinition,
    ) -> PageDecision {
        if self.pages_followed >= self.max_pages {
            info!(run_id = %self.run_id, max_pages = self.max_pages, "page limit reached");
            return PageDecision::Stop(StopReason::MaxPagesReached);
        }

        let Some(href) = next_href else {
            debug!(run_id = %self.run_id, url = %current, "no next page link");
            return PageDecision::Stop(StopReason::NoNextLink);
        };

        let Some(next) = resolve_link(current, href) else {
            debug!(run_id = %self.run_id, url = %current, href, "next page link is not a valid URL");
            return PageDecision::Stop(StopReason::InvalidLink);
        };

        if !site.is_allowed(&next) {
            info!(run_id = %self.run_id, next = %next, "next page is outside allowed domains");
            return PageDecision::Stop(StopReason::Offsite);
        }

        self.pages_followed += 1;
        debug!(
            run_id = %self.run_id,
            page = self.pages_followed,
            next = %next,
            "following next page"
        );
        PageDecision::Continue(next)
    }
}
