//! `CycleController` (Component O, §4.O): drives the outline → cycles →
//! termination state machine, generalizing the teacher's hop-loop pipeline
//! (`tools/deep_research.rs::deep_research`, a `for current_depth in
//! 1..=depth` loop with search → rerank → scrape → accumulate phases) into
//! an explicit [`CyclePhase`] state machine with semantic-state-driven query
//! generation instead of fixed-depth link-following.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::chunk::chunker::ChunkLevel;
use crate::compress::compressor::{compress, ChunkEmbedder, CompressInputs};
use crate::core::app_state::EngineState;
use crate::core::constants::{
    CYCLE_COMPLETION_FRACTION, CYCLE_QUERY_COUNT, CYCLE_TOP_TOPICS, MAX_RESULT_TOKENS, OPENING_QUERY_COUNT,
};
use crate::core::error::EngineResult;
use crate::core::types::{ContentKind, Embedding, OutlineNode, ResearchState, ResultRecord, TopicClassification};
use crate::cycle::feedback::FeedbackProcessor;
use crate::fetch::fetcher::Fetcher;
use crate::search::orchestrator::SearchOrchestrator;
use crate::search::prioritizer::{PrioritizerInputs, TopicPrioritizer};
use crate::search::providers::SearchProvider;
use crate::search::quality::QualityFilter;
use crate::semantic::pdv::compute_pdv;
use crate::semantic::transformer::TransformInputs;
use crate::semantic::{DimensionTracker, SemanticTransformer, TrajectoryAccumulator};
use crate::sources::table::SourceTable;
use crate::synthesis::llm::{ChatClient, ChatMessage, ModelKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Init,
    AwaitingFeedback,
    Cycling,
    Compressing,
    Synthesizing,
    Done,
}

/// Returned once the controller reaches `Synthesizing`; the populated
/// `ResearchState` is handed to [`crate::synthesis::engine::SynthesisEngine`]
/// by the caller.
pub struct ResearchOutcome {
    pub phase_reached: CyclePhase,
    pub cycles_run: u32,
}

pub struct CycleController {
    state: Arc<EngineState>,
    orchestrator: SearchOrchestrator,
    quality: QualityFilter,
    chat: Arc<ChatClient>,
    collection: String,
}

struct FixedEmbedder<'a> {
    cache: &'a HashMap<String, Embedding>,
}

impl<'a> ChunkEmbedder for FixedEmbedder<'a> {
    fn embed(&self, chunk: &str) -> Option<Embedding> {
        self.cache.get(chunk).cloned()
    }
}

impl CycleController {
    pub fn new(state: Arc<EngineState>, providers: Vec<Box<dyn SearchProvider>>, collection: String) -> Self {
        let chat = state.chat_client.clone();
        let orchestrator = SearchOrchestrator::new(state.clone(), providers);
        let quality = QualityFilter::new(chat.clone());
        CycleController { state, orchestrator, quality, chat, collection }
    }

    /// Runs *INIT* through *CYCLING* (and stepped *COMPRESSING*), mutating
    /// `research` in place, stopping at the boundary of *SYNTHESIZING*.
    /// `interactive` controls whether *INIT* pauses at *AWAITING_FEEDBACK*;
    /// when `false` the controller proceeds straight to *CYCLING*.
    pub async fn run(&self, research: &Arc<AsyncMutex<ResearchState>>, interactive: bool) -> EngineResult<ResearchOutcome> {
        self.run_init(research).await?;

        if interactive {
            return Ok(ResearchOutcome { phase_reached: CyclePhase::AwaitingFeedback, cycles_run: 0 });
        }

        let cycles_run = self.run_cycling(research).await?;
        self.run_compressing(research).await?;

        Ok(ResearchOutcome { phase_reached: CyclePhase::Synthesizing, cycles_run })
    }

    /// Continues a paused conversation after `AWAITING_FEEDBACK` has already
    /// been handled externally (outline mutation applied by the caller via
    /// [`crate::cycle::feedback::FeedbackProcessor`]).
    pub async fn resume_after_feedback(&self, research: &Arc<AsyncMutex<ResearchState>>) -> EngineResult<ResearchOutcome> {
        let cycles_run = self.run_cycling(research).await?;
        self.run_compressing(research).await?;
        Ok(ResearchOutcome { phase_reached: CyclePhase::Synthesizing, cycles_run })
    }

    /// *AWAITING_FEEDBACK* → outline update (§4.O, §8 scenario 3): removes
    /// the flat-outline items the user rejected, sizes replacement topics
    /// via [`FeedbackProcessor::replacement_count`], and fills them in with
    /// grouped refinement searches before the caller resumes cycling.
    /// `kept_indices`/`removed_indices` are 1-based flat-outline positions;
    /// an explicit removed list wins, otherwise removed is the complement of
    /// an explicit kept list.
    pub async fn apply_feedback(
        &self,
        research: &Arc<AsyncMutex<ResearchState>>,
        kept_indices: &[usize],
        removed_indices: &[usize],
    ) -> EngineResult<()> {
        let flat = research.lock().await.active_outline();
        let removed_topics = select_removed_topics(&flat, kept_indices, removed_indices);
        if removed_topics.is_empty() {
            return Ok(());
        }

        let replacement_count = FeedbackProcessor::replacement_count(removed_topics.len());
        let refinement_question = format!(
            "Alternative research angles to replace: {}",
            removed_topics.join("; ")
        );

        let mut gathered = Vec::new();
        if replacement_count > 0 {
            let refinement_queries = self.generate_queries(&refinement_question, replacement_count).await;
            for query in &refinement_queries {
                let Some(embedding) = self.state.embedding_client.embed_cached(&self.state, query).await else {
                    continue;
                };
                gathered.extend(self.run_one_query(research, &refinement_question, query, &embedding, 0).await);
            }
        }

        let mut replacement_topics: Vec<String> = if replacement_count > 0 {
            self.build_outline(&refinement_question, &gathered)
                .await
                .into_iter()
                .flat_map(|n| n.flat_items())
                .collect()
        } else {
            Vec::new()
        };
        replacement_topics.truncate(replacement_count);

        let mut guard = research.lock().await;
        guard.outline.retain(|node| !removed_topics.contains(&node.topic));
        for node in guard.outline.iter_mut() {
            node.subtopics.retain(|s| !removed_topics.contains(s));
        }
        for topic in replacement_topics {
            guard.outline.push(OutlineNode { topic, subtopics: Vec::new() });
        }
        Ok(())
    }

    // ---- INIT ---------------------------------------------------------

    async fn run_init(&self, research: &Arc<AsyncMutex<ResearchState>>) -> EngineResult<()> {
        let question = research.lock().await.original_question.clone();

        let opening_queries = self.generate_queries(&question, OPENING_QUERY_COUNT).await;
        let mut gathered = Vec::new();
        for query in &opening_queries {
            let Some(embedding) = self.state.embedding_client.embed_cached(&self.state, query).await else {
                continue;
            };
            gathered.extend(self.run_one_query(research, &question, query, &embedding, 0).await);
        }

        let outline = self.build_outline(&question, &gathered).await;

        let mut guard = research.lock().await;
        guard.search_history.extend(opening_queries);
        guard.outline = outline;
        guard.result_history.extend(gathered);
        Ok(())
    }

    async fn generate_queries(&self, topic: &str, count: usize) -> Vec<String> {
        let prompt = format!(
            "Research question: \"{topic}\"\nGenerate exactly {count} distinct, focused web-search queries that \
             would help answer it. Reply as a JSON array of strings, nothing else."
        );
        let messages = vec![
            ChatMessage::system("You generate web-search queries. Reply only with a JSON array of strings."),
            ChatMessage::user(prompt),
        ];

        if let Some(reply) = self.chat.complete(messages, ModelKind::Research).await {
            if let Ok(parsed) = serde_json::from_str::<Vec<String>>(reply.trim()) {
                if !parsed.is_empty() {
                    return parsed.into_iter().take(count).collect();
                }
            }
        }

        warn!("query generation failed or returned an unusable shape; falling back to templated queries for '{topic}'");
        templated_queries(topic, count)
    }

    async fn build_outline(&self, question: &str, gathered: &[ResultRecord]) -> Vec<OutlineNode> {
        let titles: Vec<&str> = gathered.iter().map(|r| r.title.as_str()).take(20).collect();
        let prompt = format!(
            "Research question: \"{question}\"\nInitial sources found: {titles:?}\n\n\
             Produce a research outline as a JSON array of objects: [{{\"topic\": str, \"subtopics\": [str, ...]}}]. \
             Reply with only the JSON array."
        );
        let messages = vec![
            ChatMessage::system("You produce structured research outlines. Reply only with a JSON array."),
            ChatMessage::user(prompt),
        ];

        #[derive(Deserialize)]
        struct RawNode {
            topic: String,
            #[serde(default)]
            subtopics: Vec<String>,
        }

        if let Some(reply) = self.chat.complete(messages, ModelKind::Research).await {
            if let Ok(parsed) = serde_json::from_str::<Vec<RawNode>>(reply.trim()) {
                if !parsed.is_empty() {
                    return parsed.into_iter().map(|n| OutlineNode { topic: n.topic, subtopics: n.subtopics }).collect();
                }
            }
        }

        warn!("outline generation failed; using single-section fallback for '{question}'");
        vec![OutlineNode { topic: question.to_string(), subtopics: Vec::new() }]
    }

    // ---- CYCLING --------------------------------------------------------

    async fn run_cycling(&self, research: &Arc<AsyncMutex<ResearchState>>) -> EngineResult<u32> {
        let max_cycles = self.state.config.max_cycles;
        let min_cycles = self.state.config.min_cycles.min(max_cycles);

        let mut dimension_tracker = self.build_dimension_tracker(research).await;
        let mut trajectory_acc: Option<TrajectoryAccumulator> = None;

        let mut cycle_index = 0u32;
        loop {
            let active_topics = research.lock().await.active_outline();
            if active_topics.is_empty() {
                info!("cycling stopped: no active topics remain");
                break;
            }

            let completed_fraction = {
                let guard = research.lock().await;
                let total = guard.completed_topics.len()
                    + guard.partial_topics.len()
                    + guard.irrelevant_topics.len()
                    + guard.active_outline().len();
                if total == 0 { 0.0 } else { guard.completed_topics.len() as f32 / total as f32 }
            };
            if completed_fraction > CYCLE_COMPLETION_FRACTION && cycle_index >= min_cycles {
                info!("cycling stopped: completed fraction {completed_fraction:.2} exceeded threshold at cycle {cycle_index}");
                break;
            }
            if cycle_index >= max_cycles {
                info!("cycling stopped: reached max_cycles {max_cycles}");
                break;
            }

            self.run_one_cycle(research, &mut dimension_tracker, &mut trajectory_acc, cycle_index, max_cycles).await?;
            cycle_index += 1;
        }

        Ok(cycle_index)
    }

    async fn build_dimension_tracker(&self, research: &Arc<AsyncMutex<ResearchState>>) -> Option<DimensionTracker> {
        let flat = research.lock().await.active_outline();
        let mut embeddings = Vec::new();
        for item in &flat {
            if let Some(e) = self.state.embedding_client.embed_cached(&self.state, item).await {
                embeddings.push(e);
            }
        }
        DimensionTracker::from_outline_embeddings(&embeddings, &HashMap::new())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_one_cycle(
        &self,
        research: &Arc<AsyncMutex<ResearchState>>,
        dimension_tracker: &mut Option<DimensionTracker>,
        trajectory_acc: &mut Option<TrajectoryAccumulator>,
        cycle_index: u32,
        max_cycles: u32,
    ) -> EngineResult<()> {
        let (active_topics, usage_counts, best_similarity, completed_names, irrelevant_names) = {
            let guard = research.lock().await;
            (
                guard.active_outline(),
                guard.topic_usage_counts.clone(),
                best_similarity_per_topic(&guard),
                guard.completed_topics.iter().cloned().collect::<Vec<_>>(),
                guard.irrelevant_topics.iter().cloned().collect::<Vec<_>>(),
            )
        };

        let mut topic_embeddings = Vec::new();
        for topic in &active_topics {
            if let Some(e) = self.state.embedding_client.embed_cached(&self.state, topic).await {
                topic_embeddings.push((topic.clone(), e));
            }
        }

        if trajectory_acc.is_none() {
            if let Some((_, first)) = topic_embeddings.first() {
                *trajectory_acc = Some(TrajectoryAccumulator::new(first.dim()));
            }
        }

        let completed_embeddings = self.embed_many(&completed_names).await;
        let irrelevant_embeddings = self.embed_many(&irrelevant_names).await;
        let pdv = compute_pdv(&completed_embeddings, &irrelevant_embeddings, active_topics.len());

        let fade = cycle_fade(cycle_index, max_cycles);
        let gap = dimension_tracker.as_ref().and_then(|t| t.gap_vector(fade));
        let trajectory = trajectory_acc.as_ref().and_then(|t| t.get_trajectory());

        let prioritizer_inputs = PrioritizerInputs {
            trajectory: trajectory.as_ref(),
            pdv: pdv.pdv.as_ref(),
            gap: gap.as_ref(),
            recent_results_centroid: None,
            completed_centroid: None,
            cycle_index,
            max_cycles,
        };
        let ranked_topics = TopicPrioritizer::rank(&topic_embeddings, &prioritizer_inputs, &usage_counts, &best_similarity);
        let top_topics: Vec<String> = ranked_topics.into_iter().take(CYCLE_TOP_TOPICS).map(|t| t.topic).collect();

        let transformer = match dimension_tracker.as_ref() {
            Some(tracker) if topic_embeddings.first().is_some() => {
                let dim = topic_embeddings[0].1.dim();
                let inputs = TransformInputs {
                    dimensions: tracker,
                    pdv: &pdv,
                    trajectory: trajectory.as_ref(),
                    gap: gap.as_ref(),
                    cycle_index,
                    max_cycles,
                };
                Some(SemanticTransformer::build(&inputs, dim))
            }
            _ => None,
        };

        let mut cycle_results = Vec::new();
        let mut cycle_queries = Vec::new();
        let mut raw_query_embeddings = Vec::new();
        let mut result_embeddings_this_cycle = Vec::new();

        for topic in &top_topics {
            let queries = self.generate_queries(topic, CYCLE_QUERY_COUNT).await;
            for query in &queries {
                let Some(raw_embedding) = self.state.embedding_client.embed_cached(&self.state, query).await else {
                    continue;
                };
                let search_embedding = match &transformer {
                    Some(t) => t.apply(&raw_embedding),
                    None => raw_embedding.clone(),
                };
                let results = self.run_one_query(research, topic, query, &search_embedding, cycle_index).await;
                result_embeddings_this_cycle.extend(results.iter().filter_map(|r| r.embedding.clone()));
                cycle_results.extend(results);
                raw_query_embeddings.push(raw_embedding);
            }
            cycle_queries.extend(queries);
        }

        if let Some(acc) = trajectory_acc {
            if !raw_query_embeddings.is_empty() && !result_embeddings_this_cycle.is_empty() {
                acc.add_cycle_data(&raw_query_embeddings, &result_embeddings_this_cycle, 1.0);
            }
        }

        let classifications = self.classify_topics(&top_topics, &cycle_results).await;

        let mut guard = research.lock().await;
        for (topic, classification) in classifications {
            match classification {
                TopicClassification::Completed => {
                    guard.completed_topics.insert(topic);
                }
                TopicClassification::Partial => {
                    guard.partial_topics.insert(topic);
                }
                TopicClassification::Irrelevant => {
                    guard.irrelevant_topics.insert(topic);
                }
                TopicClassification::New => {}
            }
        }
        for topic in &top_topics {
            *guard.topic_usage_counts.entry(topic.clone()).or_insert(0) += 1;
        }
        guard.search_history.extend(cycle_queries.clone());
        let results_gathered_so_far = guard.result_history.len() + cycle_results.len();
        guard.result_history.extend(cycle_results);
        guard.cycle_summaries.push(crate::core::types::CycleSummary {
            cycle_index,
            queries: cycle_queries,
            results_gathered: results_gathered_so_far,
            warnings: Vec::new(),
        });
        guard.check_topic_partition_invariant()?;

        if let Some(tracker) = dimension_tracker {
            for result in guard.result_history.iter().rev().take(top_topics.len() * CYCLE_QUERY_COUNT) {
                if let Some(e) = &result.embedding {
                    tracker.update_coverage(e, result.similarity.clamp(0.5, 1.0));
                }
            }
        }

        Ok(())
    }

    async fn embed_many(&self, texts: &[String]) -> Vec<Embedding> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            if let Some(e) = self.state.embedding_client.embed_cached(&self.state, t).await {
                out.push(e);
            }
        }
        out
    }

    async fn classify_topics(&self, topics: &[String], results: &[ResultRecord]) -> Vec<(String, TopicClassification)> {
        if topics.is_empty() {
            return Vec::new();
        }
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).take(10).collect();
        let prompt = format!(
            "Topics under investigation: {topics:?}\nResults gathered this cycle: {titles:?}\n\n\
             Classify each topic as one of: completed, partial, irrelevant, new. \
             Reply as a JSON object mapping topic -> classification string, nothing else."
        );
        let messages = vec![
            ChatMessage::system("You classify research topic progress. Reply only with a JSON object."),
            ChatMessage::user(prompt),
        ];

        if let Some(reply) = self.chat.complete(messages, ModelKind::Research).await {
            if let Ok(parsed) = serde_json::from_str::<HashMap<String, String>>(reply.trim()) {
                if !parsed.is_empty() {
                    return topics
                        .iter()
                        .map(|t| (t.clone(), parse_classification(parsed.get(t).map(String::as_str))))
                        .collect();
                }
            }
        }

        warn!("topic classification failed; falling back to similarity heuristic");
        let best = results.iter().map(|r| r.similarity).fold(0.0_f32, f32::max);
        topics
            .iter()
            .map(|t| {
                let classification = if best >= 0.6 {
                    TopicClassification::Completed
                } else if best >= 0.3 {
                    TopicClassification::Partial
                } else {
                    TopicClassification::Irrelevant
                };
                (t.clone(), classification)
            })
            .collect()
    }

    // ---- shared query execution -----------------------------------------

    async fn run_one_query(
        &self,
        research: &Arc<AsyncMutex<ResearchState>>,
        topic: &str,
        query: &str,
        query_embedding: &Embedding,
        cycle_index: u32,
    ) -> Vec<ResultRecord> {
        let times_selected = research.lock().await.topic_usage_counts.clone();
        let ranked = self.orchestrator.search(&self.collection, query, query_embedding, &times_selected).await;

        let fetcher = Fetcher::new(self.state.clone());
        let mut out = Vec::new();
        for candidate in ranked {
            if !self.quality.accept(query, candidate.final_similarity, &candidate.title, &candidate.snippet).await {
                continue;
            }

            let fetch_result = match fetcher.fetch(&candidate.url).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("fetch failed for {}: {e}", candidate.url);
                    continue;
                }
            };

            let pdf_mode = matches!(fetch_result.content_kind, ContentKind::Pdf);
            let content = self.compress_for_query(&fetch_result.text, query_embedding, pdf_mode).await;
            let embedding = self.state.embedding_client.embed_cached(&self.state, &content).await;
            let similarity = embedding.as_ref().map(|e| e.cosine_similarity(query_embedding)).unwrap_or(candidate.final_similarity);

            {
                let mut guard = research.lock().await;
                let mut next_id = guard.next_global_id;
                {
                    let mut table = SourceTable::new(&mut guard.source_table, &mut next_id);
                    table.upsert_seen(&candidate.url, &candidate.title, fetch_result.content_kind);
                    table.mark_selected(&candidate.url);
                }
                guard.next_global_id = next_id;
            }

            out.push(ResultRecord {
                url: candidate.url,
                title: candidate.title,
                content,
                similarity,
                embedding,
                from_local_db: candidate.from_local_db,
                cycle_index,
                query: query.to_string(),
                topic: topic.to_string(),
            });
        }
        out
    }

    async fn compress_for_query(&self, text: &str, query_embedding: &Embedding, pdf_mode: bool) -> String {
        let level = ChunkLevel::new(3);
        let chunks = crate::chunk::chunker::chunk(text, level, pdf_mode);
        let mut cache = HashMap::new();
        for c in &chunks {
            if let Some(e) = self.state.embedding_client.embed_cached(&self.state, c).await {
                cache.insert(c.clone(), e);
            }
        }
        let embedder = FixedEmbedder { cache: &cache };
        let inputs = CompressInputs {
            text,
            query_embedding,
            summary_embedding: None,
            pdv: None,
            ratio: Some(0.5),
            token_cap: Some(MAX_RESULT_TOKENS),
            pdf_mode,
            level,
        };
        compress(&inputs, &embedder, |t| ((t.split_whitespace().count() as f64) * 1.3).ceil() as usize)
    }

    // ---- COMPRESSING ------------------------------------------------------

    async fn run_compressing(&self, research: &Arc<AsyncMutex<ResearchState>>) -> EngineResult<()> {
        let mut guard = research.lock().await;
        let len = guard.result_history.len();
        let midpoint = len / 2;

        for (i, result) in guard.result_history.iter_mut().enumerate() {
            let level = if i < midpoint { ChunkLevel::new(4) } else { ChunkLevel::new(3) };
            let ratio = if i < midpoint { 0.6 } else { 0.4 };

            let Some(embedding) = result.embedding.clone() else { continue };
            let chunks = crate::chunk::chunker::chunk(&result.content, level, false);
            let mut cache = HashMap::new();
            for c in &chunks {
                cache.insert(c.clone(), embedding.clone());
            }
            let embedder = FixedEmbedder { cache: &cache };
            let inputs = CompressInputs {
                text: &result.content,
                query_embedding: &embedding,
                summary_embedding: None,
                pdv: None,
                ratio: Some(ratio),
                token_cap: None,
                pdf_mode: false,
                level,
            };
            result.content = compress(&inputs, &embedder, |t| t.split_whitespace().count());
        }
        Ok(())
    }
}

fn cycle_fade(cycle_index: u32, max_cycles: u32) -> f32 {
    let max_cycles = max_cycles.max(1) as f32;
    (1.0 - (cycle_index as f32 / max_cycles)).clamp(0.0, 1.0)
}

fn templated_queries(topic: &str, count: usize) -> Vec<String> {
    let suffixes = [
        "overview", "recent research", "methods", "key findings", "criticism", "applications", "case studies", "future directions",
    ];
    (0..count).map(|i| format!("{topic} {}", suffixes[i % suffixes.len()])).collect()
}

fn parse_classification(raw: Option<&str>) -> TopicClassification {
    match raw.map(str::to_lowercase).as_deref() {
        Some("completed") => TopicClassification::Completed,
        Some("partial") => TopicClassification::Partial,
        Some("irrelevant") => TopicClassification::Irrelevant,
        _ => TopicClassification::New,
    }
}

fn best_similarity_per_topic(research: &ResearchState) -> HashMap<String, f32> {
    let mut best: HashMap<String, f32> = HashMap::new();
    for result in &research.result_history {
        let entry = best.entry(result.topic.clone()).or_insert(0.0);
        if result.similarity > *entry {
            *entry = result.similarity;
        }
    }
    best
}

/// 1-based flat-outline indices to topic names to remove. An explicit
/// removed list (`/r`) wins; otherwise removed is the complement of an
/// explicit kept list (`/k`). Neither set present means nothing is removed.
fn select_removed_topics(flat: &[String], kept_indices: &[usize], removed_indices: &[usize]) -> Vec<String> {
    if !removed_indices.is_empty() {
        removed_indices.iter().filter_map(|&i| i.checked_sub(1)).filter_map(|i| flat.get(i)).cloned().collect()
    } else if !kept_indices.is_empty() {
        let keep: std::collections::HashSet<usize> = kept_indices.iter().copied().collect();
        flat.iter().enumerate().filter(|(i, _)| !keep.contains(&(i + 1))).map(|(_, t)| t.clone()).collect()
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templated_queries_produces_requested_count() {
        let qs = templated_queries("solar power", 4);
        assert_eq!(qs.len(), 4);
        assert!(qs.iter().all(|q| q.starts_with("solar power")));
    }

    #[test]
    fn cycle_fade_reaches_zero_at_max_cycles() {
        assert_eq!(cycle_fade(6, 6), 0.0);
        assert_eq!(cycle_fade(0, 6), 1.0);
    }

    #[test]
    fn parse_classification_defaults_to_new() {
        assert_eq!(parse_classification(Some("garbage")), TopicClassification::New);
        assert_eq!(parse_classification(Some("Completed")), TopicClassification::Completed);
    }
}
