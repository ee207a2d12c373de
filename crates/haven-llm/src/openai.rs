use async_trait::async_trait;
use haven_core::Turn;
use log::{debug, warn};
use reqwest::{header, Client};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::{json, Value};

use crate::client::LlmClient;
use crate::config::ClientConfig;
use crate::error::{LlmError, Result};

/// OpenAI-compatible chat completions client
///
/// Transient failures (connection errors, 5xx, 429) are retried with exponential backoff.
pub struct OpenAiClient {
    config: ClientConfig,
    http_client: reqwest_middleware::ClientWithMiddleware,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        // Create retry policy with exponential backoff
        let retry_policy = ExponentialBackoff::builder()
            .base(2)
            .build_with_max_retries(config.max_retries);

        let http_client = reqwest_middleware::ClientBuilder::new(
            Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| LlmError::Config(e.to_string()))?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Get the config
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build request headers
    fn build_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        if let Some((name, value)) = self.config.auth.header() {
            let name = header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| LlmError::Config(format!("Invalid auth header name: {}", e)))?;
            let value = header::HeaderValue::from_str(&value)
                .map_err(|e| LlmError::Config(format!("Invalid auth header value: {}", e)))?;
            headers.insert(name, value);
        }

        for (key, value) in &self.config.headers {
            let header_name = header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| LlmError::Config(format!("Invalid header name: {}", e)))?;
            let header_value = header::HeaderValue::from_str(value)
                .map_err(|e| LlmError::Config(format!("Invalid header value: {}", e)))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    /// Convert turns into a chat completions request body
    fn build_request_body(&self, turns: &[Turn]) -> Value {
        let messages: Vec<Value> = turns
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role.to_string(),
                    "content": turn.content,
                })
            })
            .collect();

        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

/// Extract the reply text from a chat completions response
fn parse_reply(response: &Value) -> Result<String> {
    let content = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))?;

    let content = content.trim();
    if content.is_empty() {
        return Err(LlmError::InvalidResponse("empty reply".to_string()));
    }
    Ok(content.to_string())
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn generate_reply(&self, turns: &[Turn]) -> Result<String> {
        let body = self.build_request_body(turns);
        let headers = self.build_headers()?;
        let url = self.config.completions_url();

        debug!("Sending {} turns to {}", turns.len(), url);

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let error_text = response.text().await.unwrap_or_default();
            warn!("LLM request failed with status {}", status);

            return Err(match status.as_u16() {
                401 | 403 => LlmError::Auth(error_text),
                429 => LlmError::RateLimited {
                    retry_after: retry_after.unwrap_or(60),
                },
                _ => LlmError::Api {
                    status: status.as_u16(),
                    message: error_text,
                },
            });
        }

        let response_data: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parse_reply(&response_data)
    }
}
