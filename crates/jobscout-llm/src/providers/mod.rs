//! LLM provider implementations.

pub mod common;
pub mod ollama;
pub mod openai;

pub use ollama::{OllamaProvider, OLLAMA_DEFAULT_MODEL, OLLAMA_DEFAULT_URL};
pub use openai::OpenAiProvider;

use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;
use jobscout_core::LlmConfig;
use std::sync::Arc;

/// Build the provider named by `config.provider`.
///
/// `openai` covers every OpenAI-compatible endpoint (Groq, OpenAI,
/// LM Studio); `ollama` talks to the native Ollama API.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider.as_str() {
        "openai" | "groq" | "lmstudio" => Ok(Arc::new(OpenAiProvider::from_config(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::from_config(config)?)),
        other => Err(LlmError::ProviderNotFound {
            provider_id: other.to_string(),
        }),
    }
}
