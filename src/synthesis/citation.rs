//! `CitationVerifier` (Component R, §4.R): batches up to
//! [`CITATION_VERIFY_BATCH`] citations per URL, fetches (or reuses cached)
//! source content, and asks the research model whether each quoted sentence
//! is actually supported by that source.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::app_state::EngineState;
use crate::core::constants::CITATION_VERIFY_BATCH;
use crate::core::types::CitationCandidate;
use crate::fetch::fetcher::Fetcher;
use crate::synthesis::llm::{ChatClient, ChatMessage, ModelKind};

const SOURCE_EXCERPT_CHARS: usize = 4000;

pub struct CitationVerifier {
    state: Arc<EngineState>,
    chat: Arc<ChatClient>,
}

impl CitationVerifier {
    pub fn new(state: Arc<EngineState>) -> Self {
        let chat = state.chat_client.clone();
        CitationVerifier { state, chat }
    }

    /// Verifies every candidate in place. Candidates are grouped by URL so
    /// each source is fetched once, then chunked into batches of
    /// [`CITATION_VERIFY_BATCH`] per §4.R.
    pub async fn verify_all(&self, candidates: &mut [CitationCandidate]) {
        let mut urls: Vec<String> = Vec::new();
        for c in candidates.iter() {
            if !urls.contains(&c.url) {
                urls.push(c.url.clone());
            }
        }

        let mut content_by_url: HashMap<String, Option<String>> = HashMap::new();
        for url in &urls {
            let content = self.fetch_content(url).await;
            content_by_url.insert(url.clone(), content);
        }

        for url in &urls {
            let indices: Vec<usize> =
                candidates.iter().enumerate().filter(|(_, c)| &c.url == url).map(|(i, _)| i).collect();
            let content = content_by_url.get(url).cloned().flatten();

            for batch in indices.chunks(CITATION_VERIFY_BATCH) {
                for &i in batch {
                    let outcome = match &content {
                        Some(text) => self.verify_one(text, &candidates[i].containing_sentence).await,
                        None => None,
                    };
                    match outcome {
                        Some(true) => {
                            candidates[i].verified = true;
                            candidates[i].flagged = false;
                        }
                        Some(false) => {
                            candidates[i].verified = false;
                            candidates[i].flagged = true;
                        }
                        // Source unreachable or the model gave no usable
                        // answer: "unverified but not flagged" (§4.R).
                        None => {
                            candidates[i].verified = false;
                            candidates[i].flagged = false;
                        }
                    }
                }
            }
        }
    }

    async fn fetch_content(&self, url: &str) -> Option<String> {
        let fetcher = Fetcher::new(self.state.clone());
        match fetcher.fetch(url).await {
            Ok(result) => Some(result.text),
            Err(e) => {
                tracing::warn!("citation verification could not fetch {url}: {e}");
                None
            }
        }
    }

    async fn verify_one(&self, source_text: &str, sentence: &str) -> Option<bool> {
        let excerpt: String = source_text.chars().take(SOURCE_EXCERPT_CHARS).collect();
        let prompt = format!(
            "Source content:\n\"{excerpt}\"\n\nDoes the source above contain or directly support this statement: \
             \"{sentence}\"? Answer with exactly one word: yes or no."
        );
        let messages = vec![
            ChatMessage::system("You are a strict citation verifier. Answer only \"yes\" or \"no\"."),
            ChatMessage::user(prompt),
        ];
        let reply = self.chat.complete(messages, ModelKind::Research).await?;
        Some(reply.trim().to_lowercase().starts_with('y'))
    }
}

/// Wraps `sentence` in markdown strikethrough within `text`, once, if it
/// isn't already struck. Used to apply a [`CitationCandidate`]'s `flagged`
/// outcome to the rendered report (§4.R).
pub fn strike_sentence(text: &str, sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.is_empty() || text.contains(&format!("~~{trimmed}~~")) {
        return text.to_string();
    }
    text.replacen(trimmed, &format!("~~{trimmed}~~"), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strike_sentence_wraps_once() {
        let text = "First. Second sentence here. Third.";
        let struck = strike_sentence(text, "Second sentence here.");
        assert_eq!(struck, "First. ~~Second sentence here.~~ Third.");
    }

    #[test]
    fn strike_sentence_is_idempotent() {
        let text = "First. ~~Second.~~ Third.";
        let struck = strike_sentence(text, "Second.");
        assert_eq!(struck, text);
    }
}
