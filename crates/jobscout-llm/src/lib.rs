//! JobScout LLM - chat-completion providers and the job extraction pass.
//!
//! Providers implement [`LlmProvider`]; [`OpenAiProvider`] covers any
//! OpenAI-compatible endpoint (the default configuration targets Groq) and
//! [`OllamaProvider`] a local Ollama. [`JobExtractionPass`] turns a listing
//! page into [`jobscout_core::JobRecord`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use jobscout_core::LlmConfig;
//! use jobscout_llm::{providers, ExtractionOptions, JobExtractionPass};
//! use url::Url;
//!
//! # async fn example(html: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig::default();
//! let provider = providers::from_config(&config)?;
//! let options = ExtractionOptions::from_config(
//!     &config,
//!     "div.job-card, .job-listing",
//!     "Extract job listings with all fields from the HTML content.",
//! );
//!
//! let pass = JobExtractionPass::new(provider, options);
//! let outcome = pass.extract(html, &Url::parse("https://ph.jobstreet.com/jobs/")?).await?;
//! println!("{} jobs, {} tokens", outcome.records.len(), outcome.usage.total_tokens());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod extraction;
pub mod provider;
pub mod providers;

// Re-export commonly used types
pub use error::{LlmError, Result};
pub use extraction::{ExtractionOptions, ExtractionOutcome, JobExtractionPass};
pub use provider::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, ResponseFormat, Role, Usage,
};
pub use providers::{OllamaProvider, OpenAiProvider};
