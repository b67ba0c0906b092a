//! Site definition types and structures.
//!
//! This module defines the data structures for site definitions loaded from TOML files.

use crate::error::{Result, SiteError};
use crate::rule::SelectorRule;
use chrono::NaiveDate;
use jobscout_core::{JobField, SiteId};
use serde::{Deserialize, Serialize};
use url::Url;

/// Complete site definition loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDefinition {
    /// Core site metadata
    pub site: SiteMetadata,

    /// Listing page rules
    pub listing: ListingRules,

    /// "Next page" rules
    #[serde(default)]
    pub pagination: PaginationRules,

    /// Detail page rules
    #[serde(default)]
    pub detail: DetailRules,

    /// Settings for the LLM extraction pass
    #[serde(default)]
    pub llm: LlmExtractionSettings,
}

impl SiteDefinition {
    /// Get the site ID.
    #[must_use]
    pub fn id(&self) -> &SiteId {
        &self.site.id
    }

    /// Get the site name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.site.name
    }

    /// Get the first listing page URL.
    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.site.start_url
    }

    /// Whether `url` may be requested for this site.
    ///
    /// An empty `allowed_domains` list allows every host. Subdomains of an
    /// allowed domain are allowed too.
    #[must_use]
    pub fn is_allowed(&self, url: &Url) -> bool {
        if self.site.allowed_domains.is_empty() {
            return true;
        }

        let Some(host) = url.host_str() else {
            return false;
        };

        self.site.allowed_domains.iter().any(|domain| {
            let domain = domain.trim_start_matches('.');
            host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Validate the site definition for completeness and correctness.
    pub fn validate(&self) -> Result<()> {
        if self.site.name.is_empty() {
            return Err(self.invalid("site name cannot be empty"));
        }

        let start_url = Url::parse(&self.site.start_url)
            .map_err(|e| self.invalid(&format!("start_url is not a valid URL: {e}")))?;

        if !matches!(start_url.scheme(), "http" | "https") {
            return Err(self.invalid("start_url must use http or https"));
        }

        if !self.is_allowed(&start_url) {
            return Err(self.invalid("start_url host is not in allowed_domains"));
        }

        if self.listing.item.trim().is_empty() {
            return Err(self.invalid("listing.item selector cannot be empty"));
        }

        if self.llm.container.trim().is_empty() {
            return Err(self.invalid("llm.container selector cannot be empty"));
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> SiteError {
        SiteError::ValidationError {
            site_id: self.site.id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Core site metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMetadata {
    /// Unique site identifier (e.g., "jobstreet-ph")
    pub id: SiteId,

    /// Human-readable site name
    pub name: String,

    /// First listing page
    pub start_url: String,

    /// Hosts the crawler may request; empty allows all
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Date when the selectors were last checked against the live site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verified: Option<NaiveDate>,
}

/// Rules applied to listing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingRules {
    /// Selector for one listing item fragment
    pub item: String,

    /// Ordered rules per summary field
    #[serde(default)]
    pub fields: FieldRules,
}

/// Ordered rule lists for each summary field.
///
/// Rules are tried left to right; the first non-empty match wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRules {
    /// Job title rules
    pub title: Vec<SelectorRule>,
    /// Detail link rules
    pub url: Vec<SelectorRule>,
    /// Company rules
    pub company: Vec<SelectorRule>,
    /// Location rules
    pub location: Vec<SelectorRule>,
    /// Description rules
    pub description: Vec<SelectorRule>,
}

impl FieldRules {
    /// Rules for a listing field. Salary has no listing rules.
    #[must_use]
    pub fn for_field(&self, field: JobField) -> &[SelectorRule] {
        match field {
            JobField::Title => &self.title,
            JobField::Url => &self.url,
            JobField::Company => &self.company,
            JobField::Location => &self.location,
            JobField::Description => &self.description,
            JobField::Salary => &[],
        }
    }
}

/// Rules locating the "next page" control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationRules {
    /// Ordered rules yielding the next page link
    pub next: Vec<SelectorRule>,
}

impl Default for PaginationRules {
    fn default() -> Self {
        Self {
            next: vec![SelectorRule::parse(r#"a[aria-label="Next"]::attr(href)"#)
                .expect("valid default next-page rule")],
        }
    }
}

/// Rules applied to detail pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailRules {
    /// Ordered salary rules; empty disables detail fetching
    pub salary: Vec<SelectorRule>,
}

impl DetailRules {
    /// Whether detail pages need fetching at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.salary.is_empty()
    }
}

/// Settings for the LLM extraction pass over a listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmExtractionSettings {
    /// Selector narrowing the page to job containers before chunking
    pub container: String,

    /// Instruction sent with the record schema
    pub instruction: String,

    /// Selector the browser waits for before reading the page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<String>,
}

impl Default for LlmExtractionSettings {
    fn default() -> Self {
        Self {
            container: "div.job-card, .job-listing".to_string(),
            instruction: "Extract job listings with all fields from the HTML content.".to_string(),
            wait_for: None,
        }
    }
}
