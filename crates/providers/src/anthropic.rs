//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as a top-level field

use async_trait::async_trait;
use outfitsync_core::error::ProviderError;
use outfitsync_core::provider::{Provider, ProviderRequest};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::openai_compat::map_send_error;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        if !request.system_prompt.is_empty() {
            body["system"] = serde_json::json!(request.system_prompt);
        }
        body
    }

    /// Concatenate the text blocks of a response.
    fn extract_text(response: MessagesResponse) -> Result<String, ProviderError> {
        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(&request);

        debug!(model = %request.model, "Sending Anthropic messages request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status().as_u16();
        match status {
            200 => {}
            429 => {
                return Err(ProviderError::RateLimited {
                    retry_after_secs: 10,
                });
            }
            401 | 403 => {
                return Err(ProviderError::AuthenticationFailed(
                    "Invalid Anthropic API key".into(),
                ));
            }
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(status, body = %error_body, "Anthropic returned error");
                return Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                });
            }
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::extract_text(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_is_top_level() {
        let request = ProviderRequest::new("claude-3-5-haiku-latest", "Track outfits.", "Ava: hi");
        let body = AnthropicProvider::request_body(&request);
        assert_eq!(body["system"], "Track outfits.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn text_blocks_are_joined() {
        let json = r#"{"content":[{"type":"text","text":"a "},{"type":"thinking"},{"type":"text","text":"b"}]}"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(AnthropicProvider::extract_text(response).unwrap(), "a b");
    }

    #[test]
    fn no_text_is_empty_response() {
        let response: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert!(matches!(
            AnthropicProvider::extract_text(response),
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[test]
    fn custom_base_url() {
        let p = AnthropicProvider::new("k").with_base_url("http://proxy/");
        assert_eq!(p.base_url, "http://proxy");
        assert_eq!(p.name(), "anthropic");
    }
}
