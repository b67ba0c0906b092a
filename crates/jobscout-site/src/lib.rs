//! JobScout Site - Site definition system for job-listing extraction.
//!
//! A site definition is a declarative table of selector rules: which element
//! is a listing item, the ordered rules for every field, how to find the next
//! listing page and which rules recover the salary from a detail page.
//! Definitions live as TOML files in `site-definitions/`.
//!
//! # Architecture
//!
//! - **Rules** ([`rule`]): `css::text` / `css::attr(name)` selector rules
//! - **Definition Types** ([`definition`]): Strongly-typed site configuration
//! - **Loader** ([`loader`]): TOML file loading from `site-definitions/`
//! - **Registry** ([`registry`]): In-memory cache keyed by site ID
//! - **Errors** ([`error`]): Site-specific error types
//!
//! # Example
//!
//! ```rust,no_run
//! use jobscout_core::SiteId;
//! use jobscout_site::{SiteLoader, SiteRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = SiteLoader::with_default_dir()?;
//! let registry = SiteRegistry::load_from(&loader)?;
//!
//! let site = registry.get(&SiteId::new("jobstreet-ph")?)?;
//! println!("Start URL: {}", site.start_url());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod definition;
pub mod error;
pub mod loader;
pub mod registry;
pub mod rule;

// Re-export commonly used types
pub use definition::{
    DetailRules, FieldRules, ListingRules, LlmExtractionSettings, PaginationRules, SiteDefinition,
    SiteMetadata,
};
pub use error::{Result, SiteError};
pub use loader::{load_file, SiteLoader};
pub use registry::SiteRegistry;
pub use rule::{RuleTarget, SelectorRule};
