use crate::core::constants::EMBEDDING_TEXT_TRUNCATE_CHARS;

/// Preprocesses text before hashing for cache-key purposes: truncate to
/// [`EMBEDDING_TEXT_TRUNCATE_CHARS`] and replace colons with `" - "`.
/// Matches the source's preprocessing, required for cache hit-rates on
/// title/snippet fragments (§4.A).
pub fn preprocess(text: &str) -> String {
    let truncated: String = text.chars().take(EMBEDDING_TEXT_TRUNCATE_CHARS).collect();
    truncated.replace(':', " - ")
}

/// Stable content hash used as the cache key (not cryptographic; collision
/// resistance at this scale is sufficient via a wide hash).
pub fn text_hash(text: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let preprocessed = preprocess(text);
    let mut hasher = DefaultHasher::new();
    preprocessed.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_replaces_colons() {
        assert_eq!(preprocess("title: subtitle"), "title - subtitle");
    }

    #[test]
    fn preprocess_truncates_long_text() {
        let long = "a".repeat(EMBEDDING_TEXT_TRUNCATE_CHARS + 500);
        assert_eq!(preprocess(&long).chars().count(), EMBEDDING_TEXT_TRUNCATE_CHARS);
    }

    #[test]
    fn text_hash_is_stable_for_equal_preprocessed_text() {
        assert_eq!(text_hash("a:b"), text_hash("a:b"));
        assert_ne!(text_hash("a:b"), text_hash("a:c"));
    }
}
