use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::core::config::EngineConfig;
use crate::core::constants::HTTP_TIMEOUT_SECS;

/// `POST {base}/tokenize` with `{model, prompt}`; returns `{tokens: [...]}`.
/// On any failure falls back to `⌈words × 1.3⌉` (§6, §4.B).
pub struct TokenCounter {
    http: reqwest::Client,
    config: Arc<EngineConfig>,
}

#[derive(Deserialize)]
struct TokenizeResponse {
    tokens: Vec<serde_json::Value>,
}

impl TokenCounter {
    pub fn new(http: reqwest::Client, config: Arc<EngineConfig>) -> Self {
        TokenCounter { http, config }
    }

    pub async fn count(&self, text: &str) -> usize {
        if text.trim().is_empty() {
            return 0;
        }

        let body = json!({ "model": self.config.research_model, "prompt": text });
        let resp = self
            .http
            .post(format!("{}/tokenize", self.config.lm_studio_url))
            .json(&body)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => match r.json::<TokenizeResponse>().await {
                Ok(parsed) => parsed.tokens.len(),
                Err(e) => {
                    warn!("tokenizer returned an unrecognized shape, estimating: {e}");
                    estimate_from_words(text)
                }
            },
            Ok(r) => {
                warn!("tokenizer provider returned status {}, estimating", r.status());
                estimate_from_words(text)
            }
            Err(e) => {
                warn!("tokenizer transport error, estimating: {e}");
                estimate_from_words(text)
            }
        }
    }
}

fn estimate_from_words(text: &str) -> usize {
    let words = text.split_whitespace().count();
    ((words as f64) * 1.3).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_words_by_1_3_rounded_up() {
        assert_eq!(estimate_from_words("one two three four five"), 7);
    }

    #[test]
    fn estimate_of_empty_text_is_zero() {
        assert_eq!(estimate_from_words(""), 0);
    }
}
