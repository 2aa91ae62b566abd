//! `QualityFilter` (Component M, §2): below a similarity threshold, asks the
//! research-model chat endpoint a strict yes/no relevance question rather
//! than discarding the candidate outright.

use std::sync::Arc;

use crate::synthesis::llm::{ChatClient, ChatMessage, ModelKind};

/// Candidates at or above this cosine similarity are accepted without an LLM
/// call; this keeps the filter's LLM traffic proportional to the borderline
/// cases it actually needs to adjudicate.
pub const QUALITY_SIMILARITY_THRESHOLD: f32 = 0.35;

pub struct QualityFilter {
    chat: Arc<ChatClient>,
}

impl QualityFilter {
    pub fn new(chat: Arc<ChatClient>) -> Self {
        QualityFilter { chat }
    }

    /// Returns `true` if the candidate should be kept. Candidates above the
    /// threshold are accepted directly; candidates below it are referred to
    /// the LLM for a strict yes/no call. On any LLM failure, the candidate
    /// is rejected (a cautious default — a silent failure should not look
    /// like a pass).
    pub async fn accept(&self, query: &str, similarity: f32, title: &str, snippet: &str) -> bool {
        if similarity >= QUALITY_SIMILARITY_THRESHOLD {
            return true;
        }

        let prompt = format!(
            "Research query: \"{query}\"\nCandidate result title: \"{title}\"\nCandidate snippet: \"{snippet}\"\n\
             Is this candidate plausibly relevant to the research query? Answer with exactly one word: yes or no."
        );
        let messages = vec![
            ChatMessage::system("You are a strict relevance classifier. Answer only \"yes\" or \"no\"."),
            ChatMessage::user(prompt),
        ];

        match self.chat.complete(messages, ModelKind::Research).await {
            Some(answer) => answer.trim().to_lowercase().starts_with('y'),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn threshold_is_below_one() {
        assert!(super::QUALITY_SIMILARITY_THRESHOLD < 1.0);
    }
}
