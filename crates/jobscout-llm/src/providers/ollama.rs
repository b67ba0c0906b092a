//! Ollama local LLM provider.

use super::common::{build_http_client, check_status, map_transport_error};
use crate::error::{LlmError, Result};
use crate::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, ResponseFormat, Role, Usage,
};
use async_trait::async_trait;
use jobscout_core::LlmConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER_ID: &str = "ollama";

/// Default Ollama endpoint.
pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Default Ollama model.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.1:8b";

/// Client for a local Ollama instance.
pub struct OllamaProvider {
    model: String,
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl OllamaProvider {
    /// Provider for the default local endpoint and model.
    pub fn new() -> Result<Self> {
        Self::with_url(OLLAMA_DEFAULT_URL, OLLAMA_DEFAULT_MODEL)
    }

    /// Provider with a custom URL and model.
    pub fn with_url(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            model: model.into(),
            client: build_http_client(120)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: 120,
        })
    }

    /// Provider built from configuration.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            client: build_http_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn to_api_request(&self, request: &CompletionRequest) -> OllamaRequest {
        let prompt = request
            .messages
            .iter()
            .map(|message| match message.role {
                Role::User => message.content.clone(),
                Role::Assistant => format!("Assistant: {}", message.content),
                Role::System => format!("System: {}", message.content),
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        OllamaRequest {
            model: self.model.clone(),
            prompt,
            system: request.system_prompt.clone(),
            stream: false,
            format: match request.response_format {
                ResponseFormat::Text => None,
                ResponseFormat::JsonObject => Some("json"),
            },
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens.and_then(|n| i32::try_from(n).ok()),
            },
        }
    }

    fn convert_api_response(response: OllamaResponse) -> CompletionResponse {
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (None, None) => None,
            (input, output) => Some(Usage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };

        CompletionResponse {
            content: response.response,
            model: response.model,
            stop_reason: response.done.then(|| "stop".to_string()),
            usage,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = self.to_api_request(&request);
        let endpoint = format!("{}/api/generate", self.base_url);

        debug!(endpoint = %endpoint, model = %self.model, "sending generate request");

        let response = self
            .client
            .post(&endpoint)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let response = check_status(PROVIDER_ID, response).await?;

        let api_response: OllamaResponse =
            response.json().await.map_err(|e| LlmError::ParseError {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse response: {e}"),
            })?;

        Ok(Self::convert_api_response(api_response))
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}
