use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::warn;

use crate::core::constants::HTTP_TIMEOUT_SECS;
use crate::core::error::EngineError;

use super::{RawSearchResult, SearchProvider};

/// In-process provider that calls a host-provided helper function. Stands
/// in for whatever first-party search integration the embedding process
/// provides (§6 "an in-process one that calls a host-provided helper").
pub struct InternalSearchProvider {
    helper: Arc<dyn Fn(&str, usize) -> Vec<RawSearchResult> + Send + Sync>,
}

impl InternalSearchProvider {
    pub fn new(helper: Arc<dyn Fn(&str, usize) -> Vec<RawSearchResult> + Send + Sync>) -> Self {
        InternalSearchProvider { helper }
    }
}

#[async_trait]
impl SearchProvider for InternalSearchProvider {
    fn name(&self) -> &'static str {
        "internal"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError> {
        Ok((self.helper)(query, max_results))
    }
}

/// `GET {SEARCH_URL}{encoded_query}` fallback. HTML responses are parsed by
/// selecting article result elements; JSON responses use `.results[]` or a
/// bare array (§6).
pub struct HttpSearchProvider {
    http: reqwest::Client,
    search_url: String,
}

#[derive(Deserialize)]
struct JsonResult {
    title: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonSearchResponse {
    Wrapped { results: Vec<JsonResult> },
    Bare(Vec<JsonResult>),
}

impl HttpSearchProvider {
    pub fn new(http: reqwest::Client, search_url: String) -> Self {
        HttpSearchProvider { http, search_url }
    }

    fn parse_html(body: &str) -> Vec<RawSearchResult> {
        let document = Html::parse_document(body);
        let Ok(result_selector) = Selector::parse("article.result, div.result, li.result") else {
            return Vec::new();
        };
        let title_selector = Selector::parse("a").unwrap();

        document
            .select(&result_selector)
            .filter_map(|el| {
                let link = el.select(&title_selector).next()?;
                let url = link.value().attr("href")?.to_string();
                let title = link.text().collect::<String>().trim().to_string();
                let snippet = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
                Some(RawSearchResult { title, url, snippet })
            })
            .collect()
    }

    fn parse_json(body: &str) -> Option<Vec<RawSearchResult>> {
        let parsed: JsonSearchResponse = serde_json::from_str(body).ok()?;
        let results = match parsed {
            JsonSearchResponse::Wrapped { results } => results,
            JsonSearchResponse::Bare(results) => results,
        };
        Some(
            results
                .into_iter()
                .map(|r| RawSearchResult {
                    title: r.title,
                    url: r.url,
                    snippet: r.snippet,
                })
                .collect(),
        )
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    fn name(&self) -> &'static str {
        "http_fallback"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError> {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
        let url = format!("{}{}", self.search_url, encoded);

        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await
            .map_err(EngineError::from)?;

        if !resp.status().is_success() {
            return Err(EngineError::Transport(format!(
                "search provider returned status {}",
                resp.status()
            )));
        }

        let body = resp.text().await.map_err(EngineError::from)?;

        let results = if let Some(json_results) = Self::parse_json(&body) {
            json_results
        } else {
            Self::parse_html(&body)
        };

        if results.is_empty() {
            warn!("search provider returned zero results for query: {query}");
        }

        Ok(results.into_iter().take(max_results).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_handles_wrapped_shape() {
        let body = r#"{"results": [{"title": "T", "url": "https://x", "snippet": "s"}]}"#;
        let parsed = HttpSearchProvider::parse_json(body).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn parse_json_handles_bare_array_shape() {
        let body = r#"[{"title": "T", "url": "https://x", "snippet": "s"}]"#;
        let parsed = HttpSearchProvider::parse_json(body).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn parse_html_extracts_result_elements() {
        let body = r#"<html><body><article class="result"><a href="https://x">Title</a> snippet text</article></body></html>"#;
        let parsed = HttpSearchProvider::parse_html(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].url, "https://x");
    }
}
