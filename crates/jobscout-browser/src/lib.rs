//! Browser page source for JavaScript-rendered listing sites.
//!
//! Launches headless Chromium, navigates to a page, optionally waits for a
//! selector to appear and returns the rendered HTML.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod engine;
pub mod error;
pub mod fingerprint;

pub use engine::{BrowserEngine, PageContent};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
