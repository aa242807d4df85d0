//! HTTP client for the chat completion endpoint

use crate::stream::collect_text;
use crate::ChatProvider;
use async_trait::async_trait;
use linkstash_common::config::ChatConfig;
use linkstash_common::errors::{AppError, Result};
use linkstash_common::metrics;
use serde_json::json;
use std::time::Duration;

/// Client for an OpenAI-style chat completions endpoint that streams its
/// answer in the line-oriented format handled by [`crate::stream`].
///
/// One request per completion, no retries: a chat answer is not worth
/// hammering a rate-limited upstream for, and the caller surfaces the error.
pub struct ChatClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create chat HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatProvider for ChatClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "stream": true,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_message },
            ],
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            metrics::record_chat_request(false);
            AppError::Chat {
                message: format!("chat request failed: {}", e),
            }
        })?;

        if !response.status().is_success() {
            metrics::record_chat_request(false);
            return Err(AppError::Chat {
                message: format!("chat endpoint returned {}", response.status()),
            });
        }

        let raw = response.text().await.map_err(|e| {
            metrics::record_chat_request(false);
            AppError::Chat {
                message: format!("failed to read chat response: {}", e),
            }
        })?;

        let answer = collect_text(&raw);
        if answer.is_empty() {
            metrics::record_chat_request(false);
            return Err(AppError::Chat {
                message: "chat response contained no text".to_string(),
            });
        }

        metrics::record_chat_request(true);
        tracing::debug!(chars = answer.len(), "chat completion received");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstash_common::config::AppConfig;

    #[test]
    fn test_client_construction_from_defaults() {
        let config = AppConfig::default();
        let client = ChatClient::new(&config.chat).unwrap();
        assert!(client.api_base.starts_with("http"));
        assert!(!client.model.is_empty());
    }

    #[tokio::test]
    async fn test_stub_provider_echoes_message() {
        let provider = crate::StubChatProvider;
        let answer = provider.complete("system", "what is rust?").await.unwrap();
        assert!(answer.contains("what is rust?"));
    }
}
