//! Shared types used across JobScout.
//!
//! `JobRecord` is the only entity the system produces. Every field always
//! carries either a real value or its documented sentinel.

use crate::error::{JobScoutError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Fields of a job record, each with its own sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    /// Job title
    Title,
    /// Hiring company
    Company,
    /// Job location
    Location,
    /// Salary, recovered from the detail page
    Salary,
    /// Summary description
    Description,
    /// Absolute detail-page URL
    Url,
}

impl JobField {
    /// All fields in record order.
    pub const ALL: [Self; 6] = [
        Self::Title,
        Self::Company,
        Self::Location,
        Self::Salary,
        Self::Description,
        Self::Url,
    ];

    /// Placeholder substituted when extraction yields nothing.
    #[must_use]
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::Title | Self::Company | Self::Location | Self::Url => "Not found",
            Self::Salary => "Not listed",
            Self::Description => "Description not available.",
        }
    }

    /// Key used in serialized records and site definitions.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Company => "company",
            Self::Location => "location",
            Self::Salary => "salary",
            Self::Description => "description",
            Self::Url => "url",
        }
    }

    /// Trim `value` and fall back to the sentinel when it is missing or blank.
    #[must_use]
    pub fn value_or_sentinel(&self, value: Option<&str>) -> String {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.sentinel())
            .to_string()
    }

    /// Whether `value` is this field's sentinel.
    #[must_use]
    pub fn is_sentinel(&self, value: &str) -> bool {
        value == self.sentinel()
    }
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Summary fields of a listing item, carried across the detail-fetch boundary.
///
/// `url` is already absolute (or the sentinel) when a summary exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Job location
    pub location: String,
    /// Summary description
    pub description: String,
    /// Absolute detail-page URL or the URL sentinel
    pub url: String,
}

impl JobSummary {
    /// Whether the summary has a usable detail-page URL.
    #[must_use]
    pub fn has_detail_url(&self) -> bool {
        !JobField::Url.is_sentinel(&self.url)
    }
}

/// A fully assembled job listing.
///
/// Records are immutable once built: fields are only readable.
/// Deserializing goes through [`JobRecordBuilder`], so blank or missing
/// fields come back as sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JobRecordBuilder")]
pub struct JobRecord {
    title: String,
    company: String,
    location: String,
    salary: String,
    description: String,
    url: String,
}

impl JobRecord {
    /// Start building a record; unset fields become sentinels.
    #[must_use]
    pub fn builder() -> JobRecordBuilder {
        JobRecordBuilder::default()
    }

    /// Assemble a record from listing summary fields and a salary.
    #[must_use]
    pub fn from_summary(summary: JobSummary, salary: Option<&str>) -> Self {
        Self::builder()
            .title(summary.title)
            .company(summary.company)
            .location(summary.location)
            .description(summary.description)
            .url(summary.url)
            .salary_opt(salary)
            .build()
    }

    /// Job title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Hiring company.
    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    /// Job location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Salary text or `"Not listed"`.
    #[must_use]
    pub fn salary(&self) -> &str {
        &self.salary
    }

    /// Full description (truncate only for display).
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Absolute detail-page URL or `"Not found"`.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Value of a field by name.
    #[must_use]
    pub fn get(&self, field: JobField) -> &str {
        match field {
            JobField::Title => &self.title,
            JobField::Company => &self.company,
            JobField::Location => &self.location,
            JobField::Salary => &self.salary,
            JobField::Description => &self.description,
            JobField::Url => &self.url,
        }
    }

    /// Whether the salary was recovered.
    #[must_use]
    pub fn has_salary(&self) -> bool {
        !JobField::Salary.is_sentinel(&self.salary)
    }

    /// Description shortened to at most `max_chars` characters, with `...`
    /// appended when something was cut.
    #[must_use]
    pub fn description_excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.description.chars();
        let excerpt: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{excerpt}...")
        } else {
            excerpt
        }
    }
}

/// Builder that substitutes sentinels for missing or blank values.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct JobRecordBuilder {
    title: Option<String>,
    company: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    description: Option<String>,
    url: Option<String>,
}

impl JobRecordBuilder {
    /// Set the title.
    #[must_use]
    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    /// Set the company.
    #[must_use]
    pub fn company(mut self, value: impl Into<String>) -> Self {
        self.company = Some(value.into());
        self
    }

    /// Set the location.
    #[must_use]
    pub fn location(mut self, value: impl Into<String>) -> Self {
        self.location = Some(value.into());
        self
    }

    /// Set the salary.
    #[must_use]
    pub fn salary(mut self, value: impl Into<String>) -> Self {
        self.salary = Some(value.into());
        self
    }

    /// Set the salary if one was found.
    #[must_use]
    pub fn salary_opt(mut self, value: Option<&str>) -> Self {
        self.salary = value.map(str::to_string);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, value: impl Into<String>) -> Self {
        self.description = Some(value.into());
        self
    }

    /// Set the URL.
    #[must_use]
    pub fn url(mut self, value: impl Into<String>) -> Self {
        self.url = Some(value.into());
        self
    }

    /// Build the record.
    #[must_use]
    pub fn build(self) -> JobRecord {
        JobRecord {
            title: JobField::Title.value_or_sentinel(self.title.as_deref()),
            company: JobField::Company.value_or_sentinel(self.company.as_deref()),
            location: JobField::Location.value_or_sentinel(self.location.as_deref()),
            salary: JobField::Salary.value_or_sentinel(self.salary.as_deref()),
            description: JobField::Description.value_or_sentinel(self.description.as_deref()),
            url: JobField::Url.value_or_sentinel(self.url.as_deref()),
        }
    }
}

impl From<JobRecordBuilder> for JobRecord {
    fn from(builder: JobRecordBuilder) -> Self {
        builder.build()
    }
}

/// Newtype for site identifiers with validation.
///
/// Site IDs must be lowercase alphanumeric with hyphens, 3-50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteId(String);

impl SiteId {
    /// Create a new `SiteId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<()> {
        static SITE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = SITE_REGEX
            .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,48}[a-z0-9]$").expect("valid regex"));

        if id.len() < 3 || id.len() > 50 {
            return Err(JobScoutError::Validation(format!(
                "invalid site ID: must be 3-50 characters, got {} characters",
                id.len()
            )));
        }

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(JobScoutError::Validation(format!(
                "invalid site ID: must be lowercase alphanumeric with hyphens, got '{id}'"
            )))
        }
    }
}

impl TryFrom<String> for SiteId {
    type Error = JobScoutError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SiteId> for String {
    fn from(id: SiteId) -> Self {
        id.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single crawl run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(uuid::Uuid);

impl RunId {
    /// Generate a fresh run ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
