//! `TopicPrioritizer` (Component N, §4.N): ranks remaining outline topics by
//! weighted alignment factors plus a usage dampener, reusing the same
//! cycle-adaptive fade weights as [`crate::semantic::SemanticTransformer`]
//! (§4.I).

use std::collections::HashMap;

use crate::core::constants::{GAP_EXPLORATION_WEIGHT, TRAJECTORY_MOMENTUM};
use crate::core::types::Embedding;

/// Per-topic ranking inputs already resolved by the caller (an embedding
/// per topic, plus whatever semantic-state vectors are available this
/// cycle).
pub struct PrioritizerInputs<'a> {
    pub trajectory: Option<&'a Embedding>,
    pub pdv: Option<&'a Embedding>,
    pub gap: Option<&'a Embedding>,
    pub recent_results_centroid: Option<&'a Embedding>,
    pub completed_centroid: Option<&'a Embedding>,
    pub cycle_index: u32,
    pub max_cycles: u32,
}

#[derive(Debug, Clone)]
pub struct ScoredTopic {
    pub topic: String,
    pub score: f32,
}

pub struct TopicPrioritizer;

impl TopicPrioritizer {
    /// Ranks `topics` (each paired with its embedding) high-to-low.
    /// `usage_counts` and `topic_similarity_history` drive the usage
    /// dampener: topics that have only produced low-similarity results are
    /// penalized, topics with at least one high-similarity hit are not.
    pub fn rank(
        topics: &[(String, Embedding)],
        inputs: &PrioritizerInputs,
        usage_counts: &HashMap<String, u32>,
        best_similarity_seen: &HashMap<String, f32>,
    ) -> Vec<ScoredTopic> {
        let traj_weight = TRAJECTORY_MOMENTUM;
        let gap_weight = fade_after(GAP_EXPLORATION_WEIGHT, inputs.cycle_index, inputs.max_cycles / 2, inputs.max_cycles);

        let mut scored: Vec<ScoredTopic> = topics
            .iter()
            .map(|(topic, embedding)| {
                let trajectory_alignment =
                    inputs.trajectory.map(|t| embedding.cosine_similarity(t)).unwrap_or(0.0) * traj_weight;
                let pdv_alignment = inputs.pdv.map(|p| embedding.cosine_similarity(p)).unwrap_or(0.0);
                let gap_alignment = inputs.gap.map(|g| embedding.cosine_similarity(g)).unwrap_or(0.0) * gap_weight;
                let novelty = inputs
                    .completed_centroid
                    .map(|c| 1.0 - embedding.cosine_similarity(c).max(0.0))
                    .unwrap_or(1.0);
                let info_need = inputs
                    .recent_results_centroid
                    .map(|c| 1.0 - embedding.cosine_similarity(c).max(0.0))
                    .unwrap_or(1.0);

                let raw_score = trajectory_alignment + pdv_alignment + gap_alignment + 0.25 * novelty + 0.25 * info_need;

                let usage = usage_counts.get(topic).copied().unwrap_or(0);
                let dampener = match best_similarity_seen.get(topic) {
                    Some(&sim) if sim >= 0.6 => 1.0,
                    Some(&sim) if sim > 0.0 && sim < 0.3 => 0.5,
                    _ => 0.9_f32.powi(usage as i32),
                };

                ScoredTopic { topic: topic.clone(), score: raw_score * dampener }
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}

/// Linear fade to zero starting at `fade_start_cycle` through `max_cycles`,
/// mirroring the transformer's own fade logic (§4.I).
fn fade_after(weight: f32, cycle_index: u32, fade_start_cycle: u32, max_cycles: u32) -> f32 {
    if cycle_index <= fade_start_cycle {
        return weight;
    }
    let remaining_span = (max_cycles.saturating_sub(fade_start_cycle)).max(1) as f32;
    let elapsed = (cycle_index - fade_start_cycle) as f32;
    (weight * (1.0 - elapsed / remaining_span)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_aligned_with_trajectory_rank_above_orthogonal_ones() {
        let aligned = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let orthogonal = Embedding::from_unit(vec![0.0, 1.0]).unwrap();
        let trajectory = Embedding::from_unit(vec![1.0, 0.0]).unwrap();

        let topics = vec![("aligned".to_string(), aligned), ("orthogonal".to_string(), orthogonal)];
        let inputs = PrioritizerInputs {
            trajectory: Some(&trajectory),
            pdv: None,
            gap: None,
            recent_results_centroid: None,
            completed_centroid: None,
            cycle_index: 0,
            max_cycles: 6,
        };
        let ranked = TopicPrioritizer::rank(&topics, &inputs, &HashMap::new(), &HashMap::new());
        assert_eq!(ranked[0].topic, "aligned");
    }

    #[test]
    fn low_similarity_history_dampens_score() {
        let e = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let topics = vec![("t".to_string(), e.clone())];
        let inputs = PrioritizerInputs {
            trajectory: Some(&e),
            pdv: None,
            gap: None,
            recent_results_centroid: None,
            completed_centroid: None,
            cycle_index: 0,
            max_cycles: 6,
        };
        let mut best_sim = HashMap::new();
        best_sim.insert("t".to_string(), 0.1_f32);
        let dampened = TopicPrioritizer::rank(&topics, &inputs, &HashMap::new(), &best_sim);

        let undampened = TopicPrioritizer::rank(&topics, &inputs, &HashMap::new(), &HashMap::new());
        assert!(dampened[0].score < undampened[0].score);
    }

    #[test]
    fn gap_weight_fades_to_zero_by_max_cycles() {
        assert_eq!(fade_after(GAP_EXPLORATION_WEIGHT, 6, 3, 6), 0.0);
        assert!(fade_after(GAP_EXPLORATION_WEIGHT, 1, 3, 6) == GAP_EXPLORATION_WEIGHT);
    }
}
