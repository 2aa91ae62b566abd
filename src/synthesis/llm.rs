//! Chat-completion provider client (§6 "Chat completion provider"), grounded
//! on the same request/response pattern as [`crate::embedding::client::EmbeddingClient`]
//! (this engine's own idiom for a local-model HTTP endpoint), generalized to
//! the `chat/completions` shape.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::core::config::EngineConfig;
use crate::core::constants::SYNTHESIS_TIMEOUT_SECS;

/// A single chat turn, `{role, content}`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// `POST {base}/chat/completions` with `{model, messages[], stream,
/// temperature, keep_alive}`. Streaming is never requested (§6).
pub struct ChatClient {
    http: reqwest::Client,
    config: Arc<EngineConfig>,
}

impl ChatClient {
    pub fn new(http: reqwest::Client, config: Arc<EngineConfig>) -> Self {
        ChatClient { http, config }
    }

    /// Plain completion call. Returns `None` on any provider failure; the
    /// `model` field selects between `research_model` and `synthesis_model`
    /// depending on the caller's `model_kind`.
    pub async fn complete(&self, messages: Vec<ChatMessage>, model_kind: ModelKind) -> Option<String> {
        self.complete_with_timeout(messages, model_kind, Duration::from_secs(SYNTHESIS_TIMEOUT_SECS)).await
    }

    /// As [`Self::complete`] but with an explicit timeout; synthesis calls
    /// use the 5-minute ceiling (§5 "Cancellation and timeouts"), callers
    /// doing cheaper per-chunk classification can pass a shorter one.
    pub async fn complete_with_timeout(
        &self,
        messages: Vec<ChatMessage>,
        model_kind: ModelKind,
        timeout: Duration,
    ) -> Option<String> {
        let model = match model_kind {
            ModelKind::Research => &self.config.research_model,
            ModelKind::Synthesis => &self.config.synthesis_model,
        };

        let body = json!({
            "model": model,
            "messages": messages,
            "stream": false,
            "temperature": self.config.temperature,
            "keep_alive": "5m",
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.config.lm_studio_url))
            .json(&body)
            .timeout(timeout)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                warn!("chat completion transport error: {e}");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!("chat completion provider returned status {}", resp.status());
            return None;
        }

        let parsed: Result<ChatCompletionResponse, _> = resp.json().await;
        match parsed {
            Ok(r) => r.choices.into_iter().next().map(|c| c.message.content),
            Err(e) => {
                warn!("chat completion provider returned an unrecognized shape: {e}");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Research,
    Synthesis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_completion_response_parses_expected_shape() {
        let raw = r#"{"choices": [{"message": {"content": "hello"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello");
    }
}
