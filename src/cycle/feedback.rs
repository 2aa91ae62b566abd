//! `FeedbackProcessor` (Component P, §4.O "AWAITING_FEEDBACK", §8 scenario
//! 3): parses `/k`, `/r` slash commands against 1-based flat-outline
//! indices, or falls back to an LLM kept/removed classification of free-text
//! feedback.

use std::sync::Arc;

use crate::synthesis::llm::{ChatClient, ChatMessage, ModelKind};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackCommand {
    /// `/k 1,3,5` — explicit keep list (1-based flat-outline indices).
    Keep(Vec<usize>),
    /// `/r 2,4` — explicit remove list.
    Remove(Vec<usize>),
    /// Free-text feedback with no slash command; requires an LLM pass to
    /// classify into kept/removed topics.
    Natural(String),
}

pub struct FeedbackProcessor {
    chat: Arc<ChatClient>,
}

impl FeedbackProcessor {
    pub fn new(chat: Arc<ChatClient>) -> Self {
        FeedbackProcessor { chat }
    }

    /// Parses a raw user turn into a [`FeedbackCommand`].
    pub fn parse(message: &str) -> FeedbackCommand {
        let trimmed = message.trim();
        if let Some(rest) = trimmed.strip_prefix("/k") {
            return FeedbackCommand::Keep(parse_index_list(rest));
        }
        if let Some(rest) = trimmed.strip_prefix("/r") {
            return FeedbackCommand::Remove(parse_index_list(rest));
        }
        FeedbackCommand::Natural(trimmed.to_string())
    }

    /// For free-text feedback, asks the research model which flat-outline
    /// items (by index, 1-based) the user wants kept vs removed. Returns
    /// `(kept_indices, removed_indices)`; on any LLM failure, both lists are
    /// empty (§7 "ModelError ... substitutes safe defaults").
    pub async fn classify_natural(&self, message: &str, flat_outline: &[String]) -> (Vec<usize>, Vec<usize>) {
        let numbered: String = flat_outline
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Outline items:\n{numbered}\n\nUser feedback: \"{message}\"\n\n\
             Reply with exactly two lines:\nKEEP: comma-separated item numbers the user wants to keep (or empty)\n\
             REMOVE: comma-separated item numbers the user wants removed (or empty)"
        );
        let messages = vec![
            ChatMessage::system("You classify user feedback about a research outline into kept/removed item numbers."),
            ChatMessage::user(prompt),
        ];

        let Some(reply) = self.chat.complete(messages, ModelKind::Research).await else {
            return (Vec::new(), Vec::new());
        };

        let mut kept = Vec::new();
        let mut removed = Vec::new();
        for line in reply.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("KEEP:") {
                kept = parse_index_list(rest);
            } else if let Some(rest) = line.strip_prefix("REMOVE:") {
                removed = parse_index_list(rest);
            }
        }
        (kept, removed)
    }

    /// §8 scenario 3: removing `n` topics produces `⌈0.8·n⌉` replacement
    /// topics.
    pub fn replacement_count(removed_count: usize) -> usize {
        ((removed_count as f32 * 0.8).ceil()) as usize
    }
}

fn parse_index_list(raw: &str) -> Vec<usize> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keep_command() {
        assert_eq!(FeedbackProcessor::parse("/k 1,3,5"), FeedbackCommand::Keep(vec![1, 3, 5]));
    }

    #[test]
    fn parses_remove_command() {
        assert_eq!(FeedbackProcessor::parse("/r 2,4"), FeedbackCommand::Remove(vec![2, 4]));
    }

    #[test]
    fn non_slash_message_is_natural() {
        assert_eq!(
            FeedbackProcessor::parse("please drop the history section"),
            FeedbackCommand::Natural("please drop the history section".to_string())
        );
    }

    #[test]
    fn replacement_count_matches_scenario_3() {
        assert_eq!(FeedbackProcessor::replacement_count(2), 2);
    }

    #[test]
    fn ignores_zero_and_garbage_indices() {
        assert_eq!(parse_index_list(" 0, abc, 2 "), vec![2]);
    }
}
