use nalgebra::{DMatrix, SymmetricEigen};

use crate::chunk::chunker::{chunk as chunk_text, join_chunks, ChunkLevel};
use crate::core::constants::{
    COMPRESSOR_COMPONENT_BOUNDS, COMPRESSOR_PDV_ALIGNMENT_CAP, COMPRESSOR_PDV_IMPACT_THRESHOLD,
    COMPRESSOR_VARIANCE_TARGET, LOCAL_INFLUENCE_RADIUS,
};
use crate::core::types::Embedding;
use crate::semantic::pdv::PdvResult;
use crate::tokens::counter::TokenCounter;

/// Bundles the optional signals the compressor scores against (§4.J).
pub struct CompressInputs<'a> {
    pub text: &'a str,
    pub query_embedding: &'a Embedding,
    pub summary_embedding: Option<&'a Embedding>,
    pub pdv: Option<&'a PdvResult>,
    pub ratio: Option<f32>,
    pub token_cap: Option<usize>,
    pub pdf_mode: bool,
    pub level: ChunkLevel,
}

/// A chunk embedder abstraction so the compressor doesn't need direct
/// network access; callers supply pre-computed embeddings (the engine
/// embeds chunks via `EmbeddingClient` before calling in).
pub trait ChunkEmbedder {
    fn embed(&self, chunk: &str) -> Option<Embedding>;
}

const TRIVIAL_CONTENT_CHARS: usize = 400;

/// Compresses `inputs.text` toward `inputs.token_cap`/`inputs.ratio` using
/// eigendecomposition-based chunk ranking, falling back to local-influence
/// ranking and finally character-ratio truncation (§4.J).
pub fn compress(inputs: &CompressInputs, embedder: &dyn ChunkEmbedder, count_tokens: impl Fn(&str) -> usize) -> String {
    if inputs.text.len() <= TRIVIAL_CONTENT_CHARS {
        return inputs.text.to_string();
    }
    if let Some(cap) = inputs.token_cap {
        if count_tokens(inputs.text) <= cap {
            return inputs.text.to_string();
        }
    }

    let ratio = inputs.ratio.unwrap_or(0.5).clamp(0.01, 1.0);
    compress_with_ratio(inputs, embedder, &count_tokens, ratio, 0)
}

fn compress_with_ratio(
    inputs: &CompressInputs,
    embedder: &dyn ChunkEmbedder,
    count_tokens: &impl Fn(&str) -> usize,
    ratio: f32,
    recursion_depth: u32,
) -> String {
    let chunks = chunk_text(inputs.text, inputs.level, inputs.pdf_mode);
    if chunks.is_empty() {
        return inputs.text.to_string();
    }

    let mut embeddings = Vec::with_capacity(chunks.len());
    for c in &chunks {
        match embedder.embed(c) {
            Some(e) => embeddings.push(e),
            None => return char_ratio_fallback(inputs.text, ratio),
        }
    }

    let selected = match eigen_rank(&chunks, &embeddings, inputs) {
        Some(ranked) => ranked,
        None => local_influence_rank(&chunks, &embeddings, inputs),
    };

    let n_keep = ((chunks.len() as f32) * ratio).floor().max(1.0) as usize;
    let mut top: Vec<usize> = selected.into_iter().take(n_keep).collect();
    top.sort_unstable();

    let kept_chunks: Vec<String> = top.iter().map(|&i| chunks[i].clone()).collect();
    let joined = join_chunks(&kept_chunks, inputs.level);

    if let Some(cap) = inputs.token_cap {
        let current_tokens = count_tokens(&joined);
        if current_tokens > cap && recursion_depth < 4 && current_tokens > 0 {
            let next_ratio = (cap as f32 / current_tokens as f32 * ratio).clamp(0.01, ratio - 0.01);
            if next_ratio < ratio {
                return compress_with_ratio(inputs, embedder, count_tokens, next_ratio, recursion_depth + 1);
            }
        }
    }

    joined
}

/// Eigendecomposition-ranked chunk indices, highest score first. Returns
/// `None` if decomposition is not viable (e.g. fewer than 3 chunks).
fn eigen_rank(chunks: &[String], embeddings: &[Embedding], inputs: &CompressInputs) -> Option<Vec<usize>> {
    if chunks.len() < COMPRESSOR_COMPONENT_BOUNDS.0 {
        return None;
    }
    let dim = embeddings[0].dim();
    let rows = embeddings.len();
    let mut data = Vec::with_capacity(rows * dim);
    for e in embeddings {
        data.extend_from_slice(e.as_slice());
    }
    let matrix = DMatrix::from_row_slice(rows, dim, &data);
    let mean = matrix.row_mean();
    let centered = DMatrix::from_fn(rows, dim, |r, c| matrix[(r, c)] - mean[c]);
    let covariance = (&centered.transpose() * &centered) / (rows.max(1) as f32);
    let eigen = SymmetricEigen::new(covariance);

    let mut indexed: Vec<(f32, usize)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, v)| (v.max(0.0), i))
        .collect();
    indexed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let total: f32 = indexed.iter().map(|(v, _)| v).sum::<f32>().max(1e-10);

    let mut cumulative = 0.0f32;
    let mut kept_components = Vec::new();
    for &(value, idx) in &indexed {
        kept_components.push(idx);
        cumulative += value / total;
        if kept_components.len() >= COMPRESSOR_COMPONENT_BOUNDS.0
            && (cumulative >= COMPRESSOR_VARIANCE_TARGET || kept_components.len() >= COMPRESSOR_COMPONENT_BOUNDS.1)
        {
            break;
        }
    }

    let projections: Vec<Vec<f32>> = (0..rows)
        .map(|r| {
            kept_components
                .iter()
                .map(|&c| {
                    let eigenvector = eigen.eigenvectors.column(c);
                    centered.row(r).iter().zip(eigenvector.iter()).map(|(a, b)| a * b).sum()
                })
                .collect()
        })
        .collect();

    let query_relevance = |i: usize| combined_query_relevance(&embeddings[i], inputs);

    let local_coherence = |i: usize| {
        let lo = i.saturating_sub(LOCAL_INFLUENCE_RADIUS);
        let hi = (i + LOCAL_INFLUENCE_RADIUS).min(projections.len() - 1);
        let mut sims = Vec::new();
        for j in lo..=hi {
            if j == i {
                continue;
            }
            sims.push(cosine(&projections[i], &projections[j]));
        }
        if sims.is_empty() {
            0.0
        } else {
            sims.iter().sum::<f32>() / sims.len() as f32
        }
    };

    let mut scored: Vec<(f32, usize)> = (0..chunks.len())
        .map(|i| (score_chunk(local_coherence(i), query_relevance(i), &embeddings[i], inputs), i))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    Some(scored.into_iter().map(|(_, i)| i).collect())
}

/// Non-eigen fallback: same scoring formula, using raw chunk-embedding
/// similarity to neighbors within [`LOCAL_INFLUENCE_RADIUS`] instead of a
/// decomposition (§4.J).
fn local_influence_rank(chunks: &[String], embeddings: &[Embedding], inputs: &CompressInputs) -> Vec<usize> {
    let local_coherence = |i: usize| {
        let lo = i.saturating_sub(LOCAL_INFLUENCE_RADIUS);
        let hi = (i + LOCAL_INFLUENCE_RADIUS).min(embeddings.len() - 1);
        let mut sims = Vec::new();
        for j in lo..=hi {
            if j == i {
                continue;
            }
            sims.push(embeddings[i].cosine_similarity(&embeddings[j]));
        }
        if sims.is_empty() {
            0.0
        } else {
            sims.iter().sum::<f32>() / sims.len() as f32
        }
    };

    let mut scored: Vec<(f32, usize)> = (0..chunks.len())
        .map(|i| {
            (
                score_chunk(local_coherence(i), combined_query_relevance(&embeddings[i], inputs), &embeddings[i], inputs),
                i,
            )
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, i)| i).collect()
}

fn combined_query_relevance(chunk_embedding: &Embedding, inputs: &CompressInputs) -> f32 {
    let to_query = chunk_embedding.cosine_similarity(inputs.query_embedding);
    match inputs.summary_embedding {
        Some(summary) => (to_query + chunk_embedding.cosine_similarity(summary)) / 2.0,
        None => to_query,
    }
}

/// `0.4·local_coherence + 0.6·query_relevance`; when PDV impact > 0.1,
/// subtracts an equal amount from both terms and adds
/// `pdv_alignment · min(0.3, impact)` (§4.J).
fn score_chunk(local_coherence: f32, query_relevance: f32, chunk_embedding: &Embedding, inputs: &CompressInputs) -> f32 {
    let base = 0.4 * local_coherence + 0.6 * query_relevance;
    match inputs.pdv {
        Some(pdv) if pdv.impact > COMPRESSOR_PDV_IMPACT_THRESHOLD => {
            let Some(pdv_vec) = &pdv.pdv else { return base };
            let alignment = chunk_embedding.cosine_similarity(pdv_vec);
            let adjustment = pdv.impact.min(COMPRESSOR_PDV_ALIGNMENT_CAP);
            (0.4 - adjustment).max(0.0) * local_coherence
                + (0.6 - adjustment).max(0.0) * query_relevance
                + alignment * adjustment
        }
        _ => base,
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = (a.iter().map(|v| v * v).sum::<f32>()).sqrt();
    let norm_b = (b.iter().map(|v| v * v).sum::<f32>()).sqrt();
    if norm_a < 1e-10 || norm_b < 1e-10 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

fn char_ratio_fallback(text: &str, ratio: f32) -> String {
    let keep = ((text.chars().count() as f32) * ratio).ceil().max(1.0) as usize;
    text.chars().take(keep).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StubEmbedder(HashMap<String, Embedding>);
    impl ChunkEmbedder for StubEmbedder {
        fn embed(&self, chunk: &str) -> Option<Embedding> {
            self.0.get(chunk).cloned().or_else(|| Embedding::normalize(vec![1.0, 0.0]))
        }
    }

    #[test]
    fn short_content_is_returned_unchanged() {
        let query = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let inputs = CompressInputs {
            text: "short text",
            query_embedding: &query,
            summary_embedding: None,
            pdv: None,
            ratio: Some(0.5),
            token_cap: None,
            pdf_mode: false,
            level: ChunkLevel::new(3),
        };
        let embedder = StubEmbedder(HashMap::new());
        assert_eq!(compress(&inputs, &embedder, |t| t.split_whitespace().count()), "short text");
    }

    #[test]
    fn compression_monotonicity_lower_ratio_yields_fewer_or_equal_tokens() {
        let long_text = (0..20)
            .map(|i| format!("Paragraph {i} about the research topic with enough content to matter."))
            .collect::<Vec<_>>()
            .join("\n\n");
        let query = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let embedder = StubEmbedder(HashMap::new());
        let count = |t: &str| t.split_whitespace().count();

        let low = CompressInputs {
            text: &long_text,
            query_embedding: &query,
            summary_embedding: None,
            pdv: None,
            ratio: Some(0.2),
            token_cap: None,
            pdf_mode: false,
            level: ChunkLevel::new(3),
        };
        let high = CompressInputs {
            text: &long_text,
            query_embedding: &query,
            summary_embedding: None,
            pdv: None,
            ratio: Some(0.8),
            token_cap: None,
            pdf_mode: false,
            level: ChunkLevel::new(3),
        };

        let low_out = compress(&low, &embedder, count);
        let high_out = compress(&high, &embedder, count);
        assert!(count(&low_out) <= count(&high_out));
    }
}
