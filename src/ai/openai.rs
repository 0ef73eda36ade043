//! OpenAI-compatible chat completions strategy

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{AiDeduction, AiFailure, AiStrategy, DeductionRequest};
use crate::config::AiConfig;
use crate::{MeteoFuseError, Result};

/// Deduction over any endpoint speaking the chat completions protocol
#[derive(Debug, Clone)]
pub struct OpenAiStrategy {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_completion_tokens: u32,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiStrategy {
    /// Build from configuration; `None` when AI is disabled or has no key
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
        if !config.is_active() {
            return Ok(None);
        }
        let Some(api_key) = config.resolved_api_key() else {
            return Ok(None);
        };

        let timeout = Duration::from_secs(u64::from(config.timeout_seconds));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeteoFuseError::config(format!("Failed to build AI client: {e}")))?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_completion_tokens: config.max_completion_tokens,
            timeout,
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn classify_error(&self, err: &reqwest::Error) -> AiFailure {
        if err.is_timeout() {
            AiFailure::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            AiFailure::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl AiStrategy for OpenAiStrategy {
    fn name(&self) -> &str {
        &self.model
    }

    async fn deduce(&self, request: &DeductionRequest) -> std::result::Result<AiDeduction, AiFailure> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_prompt()},
                {"role": "user", "content": request.user_prompt()},
            ],
            "max_completion_tokens": self.max_completion_tokens,
            "response_format": {"type": "json_object"},
        });

        debug!(model = %self.model, sources = request.source_count, "Requesting AI deduction");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_error(&e))?
            .error_for_status()
            .map_err(|e| self.classify_error(&e))?;

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiFailure::Malformed(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AiFailure::EmptyContent)?;

        AiDeduction::from_content(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config_yields_no_strategy() {
        let config = AiConfig {
            enabled: false,
            api_key: Some("sk-test-key".to_string()),
            ..AiConfig::default()
        };
        assert!(OpenAiStrategy::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = AiConfig {
            api_key: Some("sk-test-key".to_string()),
            base_url: "http://localhost:8080/v1/".to_string(),
            ..AiConfig::default()
        };
        let strategy = OpenAiStrategy::from_config(&config).unwrap().unwrap();
        assert_eq!(strategy.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(strategy.name(), "gpt-5-mini");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_failure_not_a_panic() {
        let config = AiConfig {
            api_key: Some("sk-test-key".to_string()),
            // Port 9 (discard) is closed on test hosts; connection is refused
            base_url: "http://127.0.0.1:9/v1".to_string(),
            timeout_seconds: 2,
            ..AiConfig::default()
        };
        let strategy = OpenAiStrategy::from_config(&config).unwrap().unwrap();
        let request = DeductionRequest {
            location_name: "Prague".to_string(),
            comparison: String::new(),
            source_count: 0,
            language: "en".to_string(),
        };
        let result = strategy.deduce(&request).await;
        assert!(matches!(
            result,
            Err(AiFailure::Transport(_) | AiFailure::Timeout { .. })
        ));
    }
}
