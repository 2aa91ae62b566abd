use regex::Regex;
use std::sync::OnceLock;

/// One of the ten chunking granularities from §4.C. Levels 1–2 split by
/// punctuation boundary (phrase, then sentence); level 3 splits paragraphs;
/// levels 4–10 concatenate `(level - 2)` paragraphs per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLevel(u8);

impl ChunkLevel {
    pub fn new(level: u8) -> Self {
        ChunkLevel(level.clamp(1, 10))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

fn sentence_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+\s+").unwrap())
}

fn phrase_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,;:]\s+").unwrap())
}

/// Splits `text` at each match of `boundary`, keeping the matched
/// punctuation attached to the preceding segment (the `regex` crate has no
/// lookbehind, so the split is done by hand over match positions).
fn split_keeping_punctuation(text: &str, boundary: &Regex) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut last_end = 0usize;
    for m in boundary.find_iter(text) {
        let punct_end = text[..m.end()]
            .rfind(|c: char| !c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(m.end());
        pieces.push(text[last_end..punct_end].to_string());
        last_end = m.end();
    }
    pieces.push(text[last_end..].to_string());
    pieces
}

fn paragraph_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n+").unwrap())
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_paragraphs(text: &str) -> Vec<String> {
    paragraph_boundary_re()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Level 2: sentence split. `pdf_mode` suppresses newline-based splitting
/// inside a paragraph to avoid page-break pollution (§4.C).
fn split_sentences(paragraph: &str, pdf_mode: bool) -> Vec<String> {
    let normalized = if pdf_mode {
        paragraph.replace('\n', " ")
    } else {
        paragraph.to_string()
    };
    split_keeping_punctuation(&normalized, sentence_boundary_re())
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Level 1: phrase split, further dividing sentences at comma/semicolon/
/// colon boundaries.
fn split_phrases(sentence: &str) -> Vec<String> {
    split_keeping_punctuation(sentence, phrase_boundary_re())
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Chunks `text` at the requested granularity. Never emits empty chunks.
/// Concatenating the result with [`separator_for`] and normalizing
/// whitespace reproduces the whitespace-normalized original (§4.C
/// invariant).
pub fn chunk(text: &str, level: ChunkLevel, pdf_mode: bool) -> Vec<String> {
    let paragraphs = split_paragraphs(text);
    if paragraphs.is_empty() {
        return Vec::new();
    }

    match level.value() {
        1 => paragraphs
            .iter()
            .flat_map(|p| split_sentences(p, pdf_mode))
            .flat_map(|s| split_phrases(&s))
            .filter(|c| !c.is_empty())
            .collect(),
        2 => paragraphs
            .iter()
            .flat_map(|p| split_sentences(p, pdf_mode))
            .filter(|c| !c.is_empty())
            .collect(),
        3 => paragraphs,
        n => {
            let group_size = (n - 2) as usize;
            paragraphs
                .chunks(group_size.max(1))
                .map(|group| group.join("\n\n"))
                .collect()
        }
    }
}

/// Separator that reproduces the original text (up to whitespace
/// normalization) when joining chunks produced at `level`.
pub fn separator_for(level: ChunkLevel) -> &'static str {
    match level.value() {
        1 => " ",
        2 => " ",
        _ => "\n\n",
    }
}

pub fn join_chunks(chunks: &[String], level: ChunkLevel) -> String {
    chunks.join(separator_for(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "First sentence here. Second sentence follows!\n\nA new paragraph starts, with a clause; and another clause.";

    #[test]
    fn level_3_splits_into_paragraphs() {
        let chunks = chunk(SAMPLE, ChunkLevel::new(3), false);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn level_2_splits_into_sentences() {
        let chunks = chunk(SAMPLE, ChunkLevel::new(2), false);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn level_1_splits_finer_than_level_2() {
        let level1 = chunk(SAMPLE, ChunkLevel::new(1), false);
        let level2 = chunk(SAMPLE, ChunkLevel::new(2), false);
        assert!(level1.len() >= level2.len());
    }

    #[test]
    fn no_chunk_is_ever_empty() {
        for level in 1..=10u8 {
            for c in chunk(SAMPLE, ChunkLevel::new(level), false) {
                assert!(!c.is_empty());
            }
        }
    }

    #[test]
    fn round_trip_reproduces_normalized_text() {
        for level in 1..=3u8 {
            let lvl = ChunkLevel::new(level);
            let chunks = chunk(SAMPLE, lvl, false);
            let rejoined = join_chunks(&chunks, lvl);
            assert_eq!(normalize_whitespace(&rejoined), normalize_whitespace(SAMPLE));
        }
    }

    #[test]
    fn pdf_mode_suppresses_newline_splitting_at_level_2() {
        let pdf_text = "Line one continues\nacross a page break. Next sentence.";
        let chunks = chunk(pdf_text, ChunkLevel::new(2), true);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn level_10_concatenates_eight_paragraphs() {
        let many_paragraphs: String = (0..10)
            .map(|i| format!("Paragraph number {i}."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunk(&many_paragraphs, ChunkLevel::new(10), false);
        assert_eq!(chunks.len(), 2);
    }
}
