//! OpenAI-compatible chat completions provider.
//!
//! Works against OpenAI itself and compatible endpoints such as Groq and
//! LM Studio; only the base URL and model differ.

use super::common::{
    build_http_client, check_status, convert_role_standard, map_transport_error, StandardMessage,
    StandardUsage,
};
use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider, ResponseFormat, Usage};
use async_trait::async_trait;
use jobscout_core::LlmConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER_ID: &str = "openai";

/// Chat completions client.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl OpenAiProvider {
    /// Provider for `api.openai.com` with the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, "gpt-4o-mini")
    }

    /// Provider for `api.openai.com` with a specific model.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(60)?,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        })
    }

    /// Provider built from configuration; reads the key from `api_key_env`.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or_else(|| LlmError::MissingApiKey {
            env_var: config.api_key_env.clone(),
        })?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            client: build_http_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Point the provider at another OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn to_api_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system) = &request.system_prompt {
            messages.push(StandardMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.extend(request.messages.iter().map(|message| StandardMessage {
            role: convert_role_standard(message.role).to_string(),
            content: message.content.clone(),
        }));

        OpenAiRequest {
            model: self.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: match request.response_format {
                ResponseFormat::Text => None,
                ResponseFormat::JsonObject => Some(ApiResponseFormat {
                    kind: "json_object",
                }),
            },
        }
    }

    fn convert_api_response(response: OpenAiResponse) -> Result<CompletionResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError {
                provider: PROVIDER_ID.to_string(),
                message: "no choices in response".to_string(),
            })?;

        Ok(CompletionResponse {
            content: choice.message.content,
            model: response.model,
            stop_reason: choice.finish_reason,
            usage: response.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = self.to_api_request(&request);
        let endpoint = format!("{}/chat/completions", self.base_url);

        debug!(endpoint = %endpoint, model = %self.model, "sending chat completion");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_secs))?;

        let response = check_status(PROVIDER_ID, response).await?;

        let api_response: OpenAiResponse =
            response.json().await.map_err(|e| LlmError::ParseError {
                provider: PROVIDER_ID.to_string(),
                message: format!("failed to parse response: {e}"),
            })?;

        Self::convert_api_response(api_response)
    }

    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<StandardMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ApiResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ApiResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<StandardUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: StandardMessage,
    finish_reason: Option<String>,
}
