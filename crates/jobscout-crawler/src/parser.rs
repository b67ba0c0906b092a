//! Listing and detail page parsing.

use crate::extractor::SiteRules;
use jobscout_core::{JobField, JobSummary};
use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

/// Everything read from one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Item summaries in document order
    pub summaries: Vec<JobSummary>,
    /// Raw "next page" link, unresolved
    pub next_href: Option<String>,
}

/// Read item summaries and the next-page link from a listing page.
///
/// Detail links are resolved against `page_url`; links that cannot be
/// resolved become the URL sentinel. At most `max_items` items are read when
/// a limit is given.
#[must_use]
pub fn parse_listing(
    rules: &SiteRules,
    html: &str,
    page_url: &Url,
    max_items: Option<usize>,
) -> ListingPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let limit = max_items.unwrap_or(usize::MAX);
    let summaries: Vec<JobSummary> = document
        .select(&rules.item)
        .take(limit)
        .map(|item| parse_item(rules, item, page_url))
        .collect();

    let next_href = rules.next.extract_first(root);

    debug!(
        url = %page_url,
        items = summaries.len(),
        has_next = next_href.is_some(),
        "parsed listing page"
    );

    ListingPage {
        summaries,
        next_href,
    }
}

fn parse_item(rules: &SiteRules, item: ElementRef<'_>, page_url: &Url) -> JobSummary {
    let url = rules
        .url
        .extract_first(item)
        .and_then(|href| resolve_link(page_url, &href))
        .map(String::from);

    JobSummary {
        title: rules.title.extract_or_sentinel(item, JobField::Title),
        company: rules.company.extract_or_sentinel(item, JobField::Company),
        location: rules.location.extract_or_sentinel(item, JobField::Location),
        description: rules
            .description
            .extract_or_sentinel(item, JobField::Description),
        url: JobField::Url.value_or_sentinel(url.as_deref()),
    }
}

/// Read only the next-page link from a listing page.
#[must_use]
pub fn parse_next_href(rules: &SiteRules, html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    rules.next.extract_first(document.root_element())
}

/// Read the salary from a detail page.
#[must_use]
pub fn parse_detail_salary(rules: &SiteRules, html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    rules.salary.extract_first(document.root_element())
}

/// Resolve `href` against `base`, keeping only http(s) results.
#[must_use]
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}
