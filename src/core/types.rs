//! Core data model (spec.md §3), encoded as explicit structs and tagged
//! enums rather than the untyped mapping the source system uses (§9
//! "Dynamic shapes across state values").

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::constants::UNIT_NORM_TOLERANCE;
use super::error::EngineError;

/// L2-normalized fixed-dimension vector. The only legal way to obtain one is
/// through [`Embedding::from_unit`] or [`Embedding::normalize`]; both enforce
/// the norm-within-tolerance invariant from §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Normalizes `values` to unit length. Returns `None` if the input norm
    /// is too close to zero to normalize meaningfully.
    pub fn normalize(values: Vec<f32>) -> Option<Self> {
        let norm = (values.iter().map(|v| v * v).sum::<f32>()).sqrt();
        if !norm.is_finite() || norm < 1e-10 {
            return None;
        }
        let unit: Vec<f32> = values.into_iter().map(|v| v / norm).collect();
        Some(Embedding(unit))
    }

    /// Wraps an already-unit-norm vector, asserting the §3 invariant.
    /// Returns `EngineError::State` if the norm is out of tolerance — this
    /// indicates a bug upstream, not a recoverable runtime condition.
    pub fn from_unit(values: Vec<f32>) -> Result<Self, EngineError> {
        let norm = (values.iter().map(|v| v * v).sum::<f32>()).sqrt();
        if (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(EngineError::State(format!(
                "embedding norm {norm} outside unit tolerance {UNIT_NORM_TOLERANCE}"
            )));
        }
        Ok(Embedding(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn dot(&self, other: &Embedding) -> f32 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        // Both operands are unit-norm by construction, so the dot product
        // already is the cosine similarity.
        self.dot(other).clamp(-1.0, 1.0)
    }

    pub fn centroid<'a>(embeddings: impl IntoIterator<Item = &'a Embedding>) -> Option<Embedding> {
        let mut sum: Option<Vec<f32>> = None;
        let mut count = 0usize;
        for e in embeddings {
            count += 1;
            match &mut sum {
                None => sum = Some(e.0.clone()),
                Some(acc) => {
                    for (a, b) in acc.iter_mut().zip(e.0.iter()) {
                        *a += b;
                    }
                }
            }
        }
        let sum = sum?;
        if count == 0 {
            return None;
        }
        let mean: Vec<f32> = sum.into_iter().map(|v| v / count as f32).collect();
        Embedding::normalize(mean)
    }
}

/// Ordered text chunks with a parallel sequence of embeddings; entry *i* of
/// `embeddings` corresponds to chunk *i* of `chunks` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkedContent {
    pub chunks: Vec<String>,
    pub embeddings: Vec<Embedding>,
}

impl ChunkedContent {
    pub fn new(chunks: Vec<String>, embeddings: Vec<Embedding>) -> Result<Self, EngineError> {
        if chunks.len() != embeddings.len() {
            return Err(EngineError::State(format!(
                "chunk/embedding length mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        Ok(ChunkedContent { chunks, embeddings })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Web,
    Pdf,
    Archived,
}

/// Per unique URL. `global_id` is assigned monotonically on first *citation*
/// use, not on first fetch, keeping bibliography IDs dense (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub global_id: Option<u32>,
    pub title: String,
    pub url: String,
    pub content_type: ContentKind,
    pub first_seen_at: chrono::DateTime<chrono::Utc>,
    pub cited_in_sections: HashSet<String>,
    pub total_tokens: usize,
    pub times_selected: u32,
    pub times_considered: u32,
}

impl SourceRecord {
    pub fn new(url: String, title: String, content_type: ContentKind) -> Self {
        SourceRecord {
            global_id: None,
            title,
            url,
            content_type,
            first_seen_at: chrono::Utc::now(),
            cited_in_sections: HashSet::new(),
            total_tokens: 0,
            times_selected: 0,
            times_considered: 0,
        }
    }
}

/// `{ topic, subtopics }`; the flat view is `(topic, subtopics...)` in
/// document order (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineNode {
    pub topic: String,
    pub subtopics: Vec<String>,
}

impl OutlineNode {
    pub fn flat_items(&self) -> Vec<String> {
        std::iter::once(self.topic.clone())
            .chain(self.subtopics.iter().cloned())
            .collect()
    }
}

pub fn outline_flat_list(outline: &[OutlineNode]) -> Vec<String> {
    outline.iter().flat_map(|n| n.flat_items()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicClassification {
    Completed,
    Partial,
    Irrelevant,
    New,
}

/// A single search/fetch result as it flows through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub url: String,
    pub title: String,
    pub content: String,
    pub similarity: f32,
    pub embedding: Option<Embedding>,
    pub from_local_db: bool,
    pub cycle_index: u32,
    pub query: String,
    /// Outline topic the originating query was generated for; distinct from
    /// `query` since `generate_queries(topic, count)` produces several query
    /// strings per topic (used to key per-topic best-similarity tracking).
    pub topic: String,
}

/// `{ local_id, raw_text, containing_sentence, url, section_id, subtopic_id,
/// verified, flagged }` (§3). Local IDs are valid only within the subtopic
/// they were generated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationCandidate {
    pub local_id: u32,
    pub raw_text: String,
    pub containing_sentence: String,
    pub url: String,
    pub section_id: String,
    pub subtopic_id: String,
    pub verified: bool,
    pub flagged: bool,
}

/// Key for the local→global citation relocalization table, per §9 Design
/// Note: keyed on the tuple, not on `local_id` alone.
pub type LocalCitationKey = (String, String, u32);

/// Per-cycle semantic-state snapshot kept for analysis/debugging; not itself
/// part of the persisted `ResearchState` invariant set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_index: u32,
    pub queries: Vec<String>,
    pub results_gathered: usize,
    pub warnings: Vec<String>,
}

/// One `ResearchState` per (user, first-message-id); see §3 "Lifecycle".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    pub original_question: String,
    pub outline: Vec<OutlineNode>,
    pub outline_embedding: Option<Embedding>,
    pub result_history: Vec<ResultRecord>,
    pub search_history: Vec<String>,
    pub completed_topics: HashSet<String>,
    pub partial_topics: HashSet<String>,
    pub irrelevant_topics: HashSet<String>,
    pub topic_usage_counts: HashMap<String, u32>,
    pub cycle_summaries: Vec<CycleSummary>,
    pub source_table: HashMap<String, SourceRecord>,
    pub next_global_id: u32,
    pub global_citation_map: HashMap<String, u32>,
    pub memory_tokens_per_section: HashMap<String, usize>,
    pub research_completed: bool,
}

impl ResearchState {
    pub fn new(original_question: String) -> Self {
        ResearchState {
            original_question,
            outline: Vec::new(),
            outline_embedding: None,
            result_history: Vec::new(),
            search_history: Vec::new(),
            completed_topics: HashSet::new(),
            partial_topics: HashSet::new(),
            irrelevant_topics: HashSet::new(),
            topic_usage_counts: HashMap::new(),
            cycle_summaries: Vec::new(),
            source_table: HashMap::new(),
            next_global_id: 1,
            global_citation_map: HashMap::new(),
            memory_tokens_per_section: HashMap::new(),
            research_completed: false,
        }
    }

    pub fn active_outline(&self) -> Vec<String> {
        outline_flat_list(&self.outline)
            .into_iter()
            .filter(|t| {
                !self.completed_topics.contains(t)
                    && !self.partial_topics.contains(t)
                    && !self.irrelevant_topics.contains(t)
            })
            .collect()
    }

    /// §8 invariant: `completed ∩ irrelevant = ∅` and the four sets partition
    /// `all_topics` at the end of every cycle.
    pub fn check_topic_partition_invariant(&self) -> Result<(), EngineError> {
        if !self.completed_topics.is_disjoint(&self.irrelevant_topics) {
            return Err(EngineError::State(
                "completed_topics and irrelevant_topics overlap".to_string(),
            ));
        }
        let all: HashSet<String> = outline_flat_list(&self.outline).into_iter().collect();
        let mut accounted: HashSet<String> = self.completed_topics.clone();
        accounted.extend(self.partial_topics.iter().cloned());
        accounted.extend(self.irrelevant_topics.iter().cloned());
        accounted.extend(self.active_outline());
        if accounted != all {
            return Err(EngineError::State(
                "topic sets do not partition all_topics".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_normalize_is_unit_norm() {
        let e = Embedding::normalize(vec![3.0, 4.0]).unwrap();
        let norm: f32 = e.as_slice().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < UNIT_NORM_TOLERANCE * 10.0);
    }

    #[test]
    fn embedding_normalize_rejects_zero_vector() {
        assert!(Embedding::normalize(vec![0.0, 0.0]).is_none());
    }

    #[test]
    fn chunked_content_rejects_length_mismatch() {
        let chunks = vec!["a".to_string()];
        let embeddings = vec![];
        assert!(ChunkedContent::new(chunks, embeddings).is_err());
    }

    #[test]
    fn topic_partition_invariant_holds_for_fresh_state() {
        let mut state = ResearchState::new("q".to_string());
        state.outline.push(OutlineNode {
            topic: "t1".to_string(),
            subtopics: vec!["s1".to_string()],
        });
        assert!(state.check_topic_partition_invariant().is_ok());
    }

    #[test]
    fn centroid_of_two_orthogonal_unit_vectors_is_their_unit_mean() {
        let a = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let b = Embedding::from_unit(vec![0.0, 1.0]).unwrap();
        let c = Embedding::centroid([&a, &b]).unwrap();
        let expected = (0.5f32).sqrt();
        assert!((c.as_slice()[0] - expected).abs() < 1e-5);
    }
}
