//! JobScout Core - Foundation crate for the JobScout listing extractor.
//!
//! This crate provides the job record model, error handling and configuration
//! management that all other JobScout crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared types (`JobRecord`, `JobSummary`, `SiteId`, `RunId`)
//!
//! # Example
//!
//! ```rust
//! use jobscout_core::{AppConfig, JobRecord};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.crawl.max_pages, 10);
//!
//! let record = JobRecord::builder().title("  Engineer ").build();
//! assert_eq!(record.title(), "Engineer");
//! assert_eq!(record.salary(), "Not listed");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CrawlConfig, FetchConfig, LlmConfig, OutputConfig, OutputFormat,
};
pub use error::{ConfigError, ConfigResult, JobScoutError, Result};
pub use types::{JobField, JobRecord, JobRecordBuilder, JobSummary, RunId, SiteId};
