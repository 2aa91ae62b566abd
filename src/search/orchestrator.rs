//! `SearchOrchestrator` (Component L, §4.L): consults the knowledge store
//! before running live providers, then applies a uniform ranking pass
//! (domain priority, keyword multiplier, repeat-URL penalty) regardless of
//! where a candidate came from.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::app_state::EngineState;
use crate::core::constants::{
    KEYWORD_MULTIPLIER_PER_MATCH, MAX_KEYWORD_MULTIPLIER, MIN_LOCAL_SOURCES, SEARCH_BASE_RESULTS, SIMILARITY_CLAMP,
};
use crate::core::types::Embedding;

use super::providers::{RawSearchResult, SearchProvider};

/// A search candidate after ranking, carrying the final similarity used to
/// sort it.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub final_similarity: f32,
    pub from_local_db: bool,
}

pub struct SearchOrchestrator {
    state: Arc<EngineState>,
    providers: Vec<Box<dyn SearchProvider>>,
}

impl SearchOrchestrator {
    pub fn new(state: Arc<EngineState>, providers: Vec<Box<dyn SearchProvider>>) -> Self {
        SearchOrchestrator { state, providers }
    }

    /// Runs the full §4.L pipeline for one query. `times_selected` maps URL
    /// -> number of prior selections, used for the repeat-URL penalty and
    /// keyword-match counts come from `query_keywords`.
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        query_embedding: &Embedding,
        times_selected: &HashMap<String, u32>,
    ) -> Vec<RankedResult> {
        let local_hits = self
            .state
            .knowledge_store
            .search(collection, query, SEARCH_BASE_RESULTS * 2, 0.2)
            .await
            .unwrap_or_default();

        let (candidates, from_local): (Vec<RawSearchResult>, bool) = if local_hits.len() >= MIN_LOCAL_SOURCES {
            (
                local_hits
                    .into_iter()
                    .map(|s| RawSearchResult { title: s.title, url: s.url, snippet: s.content })
                    .collect(),
                true,
            )
        } else {
            let mut merged = Vec::new();
            for provider in &self.providers {
                match provider.search(query, SEARCH_BASE_RESULTS).await {
                    Ok(results) => merged.extend(results),
                    Err(e) => tracing::warn!("search provider {} failed: {e}", provider.name()),
                }
            }
            let to_store: Vec<(String, String, String)> =
                merged.iter().map(|r| (r.url.clone(), r.title.clone(), r.snippet.clone())).collect();
            if let Err(e) = self.state.knowledge_store.add(collection, &to_store, query, "orchestrator").await {
                tracing::warn!("failed to persist search results into knowledge store: {e}");
            }
            (merged, false)
        };

        let mut ranked = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let snippet_embedding = self.state.embedding_client.embed_cached(&self.state, &candidate.snippet).await;
            let base_similarity = snippet_embedding.map(|e| e.cosine_similarity(query_embedding)).unwrap_or(0.0);

            let domain_multiplier = domain_priority_multiplier(&candidate.url, &self.state.config.domain_priorities);
            let keyword_multiplier = keyword_multiplier(&candidate.snippet, query);
            let repeats = times_selected.get(&candidate.url).copied().unwrap_or(0);
            let repeat_penalty = (1.0 - 0.1 * repeats as f32).max(0.5);

            let final_similarity =
                (base_similarity * domain_multiplier * keyword_multiplier * repeat_penalty).min(SIMILARITY_CLAMP);

            ranked.push(RankedResult {
                title: candidate.title,
                url: candidate.url,
                snippet: candidate.snippet,
                final_similarity,
                from_local_db: from_local,
            });
        }

        ranked.sort_by(|a, b| b.final_similarity.partial_cmp(&a.final_similarity).unwrap_or(std::cmp::Ordering::Equal));

        let additional = times_selected.values().filter(|&&n| n > 0).count();
        ranked.truncate(SEARCH_BASE_RESULTS + additional);
        ranked
    }
}

fn domain_priority_multiplier(url: &str, priorities: &[(String, f32)]) -> f32 {
    priorities
        .iter()
        .filter(|(substr, _)| url.contains(substr.as_str()))
        .map(|(_, mult)| *mult)
        .fold(1.0_f32, f32::max)
}

fn keyword_multiplier(snippet: &str, query: &str) -> f32 {
    let snippet_lower = snippet.to_lowercase();
    let matches = query
        .split_whitespace()
        .filter(|word| word.len() > 2 && snippet_lower.contains(&word.to_lowercase()))
        .count();
    KEYWORD_MULTIPLIER_PER_MATCH.powi(matches as i32).min(MAX_KEYWORD_MULTIPLIER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_priority_multiplier_picks_highest_match() {
        let priorities = vec![(".gov".to_string(), 1.2), ("arxiv.org".to_string(), 1.25)];
        assert_eq!(domain_priority_multiplier("https://arxiv.org/abs/1", &priorities), 1.25);
        assert_eq!(domain_priority_multiplier("https://example.com", &priorities), 1.0);
    }

    #[test]
    fn keyword_multiplier_is_capped() {
        let snippet = "alpha beta gamma delta epsilon zeta eta theta";
        let query = "alpha beta gamma delta epsilon zeta eta theta";
        assert!(keyword_multiplier(snippet, query) <= MAX_KEYWORD_MULTIPLIER);
    }

    #[test]
    fn keyword_multiplier_is_one_with_no_matches() {
        assert_eq!(keyword_multiplier("nothing in common here", "xyzzy plugh"), 1.0);
    }
}
