pub mod academic;
pub mod web;

use async_trait::async_trait;

use crate::core::error::EngineError;

/// A single raw search hit, before scoring/reranking (§6 "Web search
/// provider").
#[derive(Debug, Clone)]
pub struct RawSearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Abstract `search(query) -> list<{title, url, snippet}>` (§6). Every
/// concrete web/academic provider implements this.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError>;
}
