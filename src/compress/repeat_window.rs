use crate::core::constants::{
    MAX_RESULT_TOKENS, REPEAT_WINDOW_FACTOR, REPEAT_WINDOW_FLOOR_TOKENS, REPEAT_WINDOW_SHRINK,
};
use crate::core::types::Embedding;

/// Sliding-window content truncation with shrinkage over repeated URL
/// visits (§4.K).
pub struct RepeatWindowManager;

/// A content chunk paired with its embedding, as used for similarity-based
/// re-centering.
pub struct WindowChunk<'a> {
    pub text: &'a str,
    pub embedding: &'a Embedding,
}

impl RepeatWindowManager {
    /// `times_selected = n`. Returns the window of chunks (by index) to
    /// keep, and reassembles them into text. `window_tokens` is the running
    /// window size; callers persist the returned size for the next call.
    pub fn select_window(
        chunks: &[WindowChunk],
        query: &Embedding,
        times_selected: u32,
        token_count_of: impl Fn(&str) -> usize,
        window_tokens: Option<usize>,
    ) -> (String, usize) {
        if times_selected == 0 {
            let full: String = chunks.iter().map(|c| c.text).collect::<Vec<_>>().join(" ");
            return (full, token_count_of(&full));
        }

        let total_tokens: usize = chunks.iter().map(|c| token_count_of(c.text)).sum();

        if total_tokens > MAX_RESULT_TOKENS {
            let current_window = window_tokens
                .map(|w| {
                    let shrink_passes = (times_selected.saturating_sub(1)) as f32;
                    let shrunk = w as f32 * REPEAT_WINDOW_SHRINK.powf(shrink_passes);
                    (shrunk as usize).max(REPEAT_WINDOW_FLOOR_TOKENS)
                })
                .unwrap_or(MAX_RESULT_TOKENS);

            let shift = ((times_selected.saturating_sub(1)) as f32
                * REPEAT_WINDOW_FACTOR
                * MAX_RESULT_TOKENS as f32) as usize;

            let (start_idx, end_idx) = token_window_bounds(chunks, &token_count_of, shift, current_window);
            let windowed: String = chunks[start_idx..end_idx]
                .iter()
                .map(|c| c.text)
                .collect::<Vec<_>>()
                .join(" ");
            (windowed, current_window)
        } else {
            // Content already fits: re-center around the highest-similarity
            // chunk, keeping roughly half the chunks on either side.
            let best_idx = chunks
                .iter()
                .enumerate()
                .map(|(i, c)| (c.embedding.cosine_similarity(query), i))
                .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(_, i)| i)
                .unwrap_or(0);

            let half = chunks.len() / 2;
            let lo = best_idx.saturating_sub(half / 2);
            let hi = (best_idx + half / 2 + 1).min(chunks.len());
            let windowed: String = chunks[lo..hi].iter().map(|c| c.text).collect::<Vec<_>>().join(" ");
            (windowed, total_tokens)
        }
    }
}

fn token_window_bounds(
    chunks: &[WindowChunk],
    token_count_of: &impl Fn(&str) -> usize,
    shift_tokens: usize,
    window_tokens: usize,
) -> (usize, usize) {
    let mut cumulative = 0usize;
    let mut start_idx = 0usize;
    for (i, c) in chunks.iter().enumerate() {
        if cumulative >= shift_tokens {
            start_idx = i;
            break;
        }
        cumulative += token_count_of(c.text);
        start_idx = i + 1;
    }
    start_idx = start_idx.min(chunks.len().saturating_sub(1));

    let mut end_idx = start_idx;
    let mut window_used = 0usize;
    while end_idx < chunks.len() && window_used < window_tokens {
        window_used += token_count_of(chunks[end_idx].text);
        end_idx += 1;
    }
    (start_idx, end_idx.max(start_idx + 1).min(chunks.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk<'a>(text: &'a str, e: &'a Embedding) -> WindowChunk<'a> {
        WindowChunk { text, embedding: e }
    }

    #[test]
    fn first_visit_returns_full_content() {
        let e = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let chunks = vec![chunk("a", &e), chunk("b", &e)];
        let query = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let (text, _) = RepeatWindowManager::select_window(&chunks, &query, 0, |t| t.len(), None);
        assert_eq!(text, "a b");
    }

    #[test]
    fn repeated_visit_on_oversized_content_shifts_window() {
        let e = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let chunk_texts: Vec<String> = (0..50).map(|i| format!("chunk{i}")).collect();
        let chunks: Vec<WindowChunk> = chunk_texts.iter().map(|t| chunk(t, &e)).collect();
        let query = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let count = |t: &str| -> usize { t.len() * 100 }; // force "oversized" branch

        let (first, window1) = RepeatWindowManager::select_window(&chunks, &query, 1, count, None);
        let (second, _) = RepeatWindowManager::select_window(&chunks, &query, 2, count, Some(window1));
        assert_ne!(first, second);
    }
}
