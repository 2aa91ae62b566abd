use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::core::app_state::EngineState;
use crate::core::constants::{ARCHIVE_RETRY_STATUSES, HTTP_TIMEOUT_SECS, MAX_RESULT_TOKENS};
use crate::core::error::EngineError;
use crate::core::types::ContentKind;

use super::extract::{extract_html, extract_pdf, is_pdf_response};

/// `fetch(url) -> FetchResult { text, content_kind }` (§4.D).
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub text: String,
    pub content_kind: ContentKind,
}

pub struct Fetcher {
    state: Arc<EngineState>,
}

impl Fetcher {
    pub fn new(state: Arc<EngineState>) -> Self {
        Fetcher { state }
    }

    fn domain_of(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| u.domain().map(str::to_string))
            .unwrap_or_else(|| url.to_string())
    }

    /// Polite HTTP GET with per-domain rate limit, cookie persistence, and
    /// archive.org fallback on 403/271 (§4.D). Errors are never retried
    /// except via the single archive path.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, EngineError> {
        if let Some(cached) = self.state.fetch_cache.get(url).await {
            return self.interpret_body(url, cached.as_bytes(), None).await;
        }

        let domain = Self::domain_of(url);
        self.state.domain_rate_limiter.wait_for_domain(&domain).await;

        let response = self.send_with_cookies(url, &domain).await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = resp.bytes().await.map_err(EngineError::from)?;
                self.cache_body(url, &bytes).await;
                self.interpret_body(url, &bytes, content_type).await
            }
            Ok(resp) if ARCHIVE_RETRY_STATUSES.contains(&resp.status().as_u16()) => {
                warn!("fetch of {url} returned {}, retrying via archive.org", resp.status());
                self.fetch_via_archive(url).await
            }
            Ok(resp) => Err(EngineError::Transport(format!(
                "fetch of {url} failed with status {}",
                resp.status()
            ))),
            Err(e) => Err(EngineError::Transport(format!("fetch of {url} failed: {e}"))),
        }
    }

    async fn send_with_cookies(
        &self,
        url: &str,
        domain: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let cookie_header = {
            let jars = self.state.cookie_jars.lock().await;
            jars.get(domain).map(|c| c.join("; "))
        };

        let mut req = self
            .state
            .http_client
            .get(url)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS));
        if let Some(cookies) = cookie_header {
            if !cookies.is_empty() {
                req = req.header(reqwest::header::COOKIE, cookies);
            }
        }

        let resp = req.send().await?;

        if let Some(set_cookie) = resp.headers().get(reqwest::header::SET_COOKIE) {
            if let Ok(value) = set_cookie.to_str() {
                let mut jars = self.state.cookie_jars.lock().await;
                jars.entry(domain.to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        Ok(resp)
    }

    async fn fetch_via_archive(&self, url: &str) -> Result<FetchResult, EngineError> {
        let archive_url = format!("https://web.archive.org/web/2/{url}");
        let resp = self
            .state
            .http_client
            .get(&archive_url)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| EngineError::Transport(format!("archive.org fetch failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::Transport(format!(
                "archive.org fallback for {url} failed with status {}",
                resp.status()
            )));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| EngineError::Transport(format!("archive.org body read failed: {e}")))?;
        self.cache_body(url, &bytes).await;
        let mut result = self.interpret_body(url, &bytes, content_type).await?;
        result.content_kind = ContentKind::Archived;
        Ok(result)
    }

    async fn cache_body(&self, url: &str, bytes: &[u8]) {
        let cap = MAX_RESULT_TOKENS * 3 * 6; // ~6 bytes/token heuristic, matching the teacher's char-based caps
        let text = String::from_utf8_lossy(bytes);
        let capped: String = text.chars().take(cap).collect();
        self.state.fetch_cache.insert(url.to_string(), Arc::new(capped)).await;
    }

    async fn interpret_body(
        &self,
        url: &str,
        bytes: &[u8],
        content_type: Option<String>,
    ) -> Result<FetchResult, EngineError> {
        if is_pdf_response(content_type.as_deref(), url) {
            info!("extracting pdf content for {url}");
            return Ok(FetchResult {
                text: extract_pdf(bytes),
                content_kind: ContentKind::Pdf,
            });
        }
        Ok(FetchResult {
            text: extract_html(bytes, url),
            content_kind: ContentKind::Web,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_of_extracts_registrable_domain() {
        assert_eq!(Fetcher::domain_of("https://www.example.com/page"), "www.example.com");
    }

    #[test]
    fn domain_of_falls_back_to_raw_url_on_parse_failure() {
        assert_eq!(Fetcher::domain_of("not a url"), "not a url");
    }
}
