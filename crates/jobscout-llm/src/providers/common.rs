//! Helpers shared across LLM providers.

use crate::error::{LlmError, Result};
use crate::provider::Role;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Build an HTTP client with the given request timeout.
pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LlmError::Internal(format!("failed to create HTTP client: {e}")))
}

/// Role name used by OpenAI-style chat APIs.
#[must_use]
pub fn convert_role_standard(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Turn a non-success HTTP response into the matching error.
pub async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthenticationFailed {
            provider: provider.to_string(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded {
            provider: provider.to_string(),
            message,
        },
        _ => LlmError::ApiError {
            provider: provider.to_string(),
            status: status.as_u16(),
            message,
        },
    })
}

/// Map a transport error, keeping timeouts distinct.
pub fn map_transport_error(error: reqwest::Error, timeout_secs: u64) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout {
            seconds: timeout_secs,
        }
    } else {
        LlmError::Network(error)
    }
}

/// Chat message for OpenAI-compatible APIs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StandardMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    /// Text content
    #[serde(default)]
    pub content: String,
}

/// Token counts as OpenAI-compatible APIs report them.
#[derive(Debug, Deserialize, Clone)]
pub struct StandardUsage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
}
