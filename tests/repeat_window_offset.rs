//! §8 scenario 4: feeding the same URL into two consecutive cycles must
//! shift the second occurrence's window by `REPEAT_WINDOW_FACTOR *
//! MAX_RESULT_TOKENS` relative to the first, rather than returning the full
//! content again.

use ire_engine::compress::repeat_window::{RepeatWindowManager, WindowChunk};
use ire_engine::core::types::Embedding;

fn one_token_per_chunk(_t: &str) -> usize {
    1
}

#[test]
fn second_visit_shifts_window_by_factor_times_max_tokens() {
    let query = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
    let chunk_embedding = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
    let labels: Vec<String> = (0..3000).map(|i| i.to_string()).collect();
    let chunks: Vec<WindowChunk> = labels
        .iter()
        .map(|t| WindowChunk { text: t, embedding: &chunk_embedding })
        .collect();

    let (first, window1) =
        RepeatWindowManager::select_window(&chunks, &query, 1, one_token_per_chunk, None);
    // First oversized occurrence: no shift yet, window = MAX_RESULT_TOKENS (2000).
    assert_eq!(window1, 2000);
    assert!(first.starts_with("0 "));
    assert!(first.ends_with("1999"));

    let (second, _window2) =
        RepeatWindowManager::select_window(&chunks, &query, 2, one_token_per_chunk, Some(window1));
    // shift = (2-1) * REPEAT_WINDOW_FACTOR(0.5) * MAX_RESULT_TOKENS(2000) = 1000
    assert!(second.starts_with("1000 "));
    assert!(second.ends_with("2399"));
    assert_ne!(first, second);
}
