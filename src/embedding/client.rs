use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::core::app_state::EngineState;
use crate::core::config::EngineConfig;
use crate::core::constants::HTTP_TIMEOUT_SECS;
use crate::core::types::Embedding;

use super::cache::{preprocess, text_hash};

/// External interface (§6): `POST {base}/embed` with `{model, input}`;
/// returns `{embedding: [...]}` or `{embeddings: [[...]]}`. Any other shape
/// is a failure and callers must tolerate a `None` result (§4.A).
pub struct EmbeddingClient {
    http: reqwest::Client,
    config: Arc<EngineConfig>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Single { embedding: Vec<f32> },
    Batch { embeddings: Vec<Vec<f32>> },
}

impl EmbeddingClient {
    pub fn new(http: reqwest::Client, config: Arc<EngineConfig>) -> Self {
        EmbeddingClient { http, config }
    }

    /// `embed(text) -> Embedding?`. Returns `None` on any provider failure;
    /// never panics.
    pub async fn embed(&self, text: &str) -> Option<Embedding> {
        let preprocessed = preprocess(text);
        if preprocessed.trim().is_empty() {
            return None;
        }

        let body = json!({ "model": self.config.embedding_model, "input": preprocessed });
        let resp = self
            .http
            .post(format!("{}/embed", self.config.lm_studio_url))
            .json(&body)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                warn!("embedding provider transport error: {e}");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!("embedding provider returned status {}", resp.status());
            return None;
        }

        let parsed: Result<EmbedResponse, _> = resp.json().await;
        let raw = match parsed {
            Ok(EmbedResponse::Single { embedding }) => embedding,
            Ok(EmbedResponse::Batch { embeddings }) => embeddings.into_iter().next()?,
            Err(e) => {
                warn!("embedding provider returned an unrecognized shape: {e}");
                return None;
            }
        };

        Embedding::normalize(raw)
    }

    /// Cache-aware embed, using `state.embedding_cache` keyed by text hash.
    pub async fn embed_cached(&self, state: &EngineState, text: &str) -> Option<Embedding> {
        let key = text_hash(text);
        if let Some(cached) = state.embedding_cache.get(&key).await {
            debug!("embedding cache hit");
            return Some(cached);
        }
        let embedding = self.embed(text).await?;
        state.embedding_cache.insert(key, embedding.clone()).await;
        Some(embedding)
    }

    /// `embed_transformed(text, transform) -> Embedding?`. The transformed
    /// cache key is `(text_hash, transform_id)` (§4.A). The returned
    /// embedding is unit-norm or `None`, matching the transformer's own
    /// contract (§4.I).
    pub async fn embed_transformed(
        &self,
        state: &EngineState,
        text: &str,
        transform_id: &str,
        apply: impl FnOnce(&Embedding) -> Embedding,
    ) -> Option<Embedding> {
        let key = (text_hash(text), transform_id.to_string());
        if let Some(cached) = state.transform_cache.get(&key).await {
            return Some(cached);
        }
        let base = self.embed_cached(state, text).await?;
        let transformed = apply(&base);
        state.transform_cache.insert(key, transformed.clone()).await;
        Some(transformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_response_parses_single_shape() {
        let raw = r#"{"embedding": [0.1, 0.2, 0.3]}"#;
        let parsed: EmbedResponse = serde_json::from_str(raw).unwrap();
        match parsed {
            EmbedResponse::Single { embedding } => assert_eq!(embedding.len(), 3),
            _ => panic!("expected Single variant"),
        }
    }

    #[test]
    fn embed_response_parses_batch_shape() {
        let raw = r#"{"embeddings": [[0.1, 0.2], [0.3, 0.4]]}"#;
        let parsed: EmbedResponse = serde_json::from_str(raw).unwrap();
        match parsed {
            EmbedResponse::Batch { embeddings } => assert_eq!(embeddings.len(), 2),
            _ => panic!("expected Batch variant"),
        }
    }
}
