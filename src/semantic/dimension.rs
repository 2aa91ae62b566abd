use std::collections::HashMap;

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::core::constants::{DIMENSION_COVERAGE_CAP, DIMENSION_COVERAGE_NORMALIZER, DIMENSION_MAX_COMPONENTS};
use crate::core::types::Embedding;

/// PCA over outline-item embeddings, tracking per-dimension coverage as
/// content accumulates (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionTracker {
    /// Unit eigenvectors, one per tracked dimension, ordered by descending
    /// explained variance.
    eigenvectors: Vec<Vec<f32>>,
    /// Fraction of total variance each eigenvector explains.
    explained_variance: Vec<f32>,
    /// Coverage accumulator, one entry per eigenvector, renormalized to
    /// [0, 1] after each update.
    coverage: Vec<f32>,
    /// Top-3 vocabulary words per dimension, computed once at construction
    /// time (§4.F "natural-language label").
    labels: Vec<Vec<String>>,
}

impl DimensionTracker {
    /// Builds a tracker from the outline's flat-item embeddings. `k =
    /// min(10, n_items)`. Returns `None` if there are no items to embed.
    pub fn from_outline_embeddings(
        items: &[Embedding],
        vocabulary: &HashMap<String, Embedding>,
    ) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let k = items.len().min(DIMENSION_MAX_COMPONENTS);
        let dim = items[0].dim();

        let rows = items.len();
        let mut data = Vec::with_capacity(rows * dim);
        for item in items {
            data.extend_from_slice(item.as_slice());
        }
        // nalgebra is column-major; build row-major then transpose view via
        // from_row_slice.
        let matrix = DMatrix::from_row_slice(rows, dim, &data);

        let mean = matrix.row_mean();
        let centered = DMatrix::from_fn(rows, dim, |r, c| matrix[(r, c)] - mean[c]);

        let covariance = (&centered.transpose() * &centered) / (rows.max(1) as f32);
        let eigen = SymmetricEigen::new(covariance);

        let mut indexed: Vec<(f32, usize)> = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, i))
            .collect();
        indexed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let total_variance: f32 = eigen.eigenvalues.iter().map(|v| v.max(0.0)).sum::<f32>().max(1e-10);

        let mut eigenvectors = Vec::with_capacity(k);
        let mut explained_variance = Vec::with_capacity(k);
        for &(value, idx) in indexed.iter().take(k) {
            let column = eigen.eigenvectors.column(idx);
            eigenvectors.push(column.iter().copied().collect::<Vec<f32>>());
            explained_variance.push((value.max(0.0)) / total_variance);
        }

        let labels = eigenvectors
            .iter()
            .map(|vec| label_dimension(vec, vocabulary))
            .collect();

        Some(DimensionTracker {
            coverage: vec![0.0; eigenvectors.len()],
            eigenvectors,
            explained_variance,
            labels,
        })
    }

    pub fn num_components(&self) -> usize {
        self.eigenvectors.len()
    }

    pub fn eigenvectors(&self) -> &[Vec<f32>] {
        &self.eigenvectors
    }

    pub fn explained_variance(&self) -> &[f32] {
        &self.explained_variance
    }

    pub fn labels(&self) -> &[Vec<String>] {
        &self.labels
    }

    pub fn coverage(&self) -> &[f32] {
        &self.coverage
    }

    /// Projects `content` onto the tracked eigenvectors and updates coverage
    /// with quality `q ∈ [0.5, 1.0]` per §4.F:
    /// `coverage[i] += |projection[i]| * q * (1 − coverage[i]/2)`, then caps
    /// at [`DIMENSION_COVERAGE_CAP`] and divides by
    /// [`DIMENSION_COVERAGE_NORMALIZER`].
    pub fn update_coverage(&mut self, content: &Embedding, quality: f32) {
        let q = quality.clamp(0.5, 1.0);
        for (i, eigenvector) in self.eigenvectors.iter().enumerate() {
            let projection = dot(content.as_slice(), eigenvector);
            let delta = projection.abs() * q * (1.0 - self.coverage[i] / 2.0);
            self.coverage[i] += delta;
            self.coverage[i] = (self.coverage[i].min(DIMENSION_COVERAGE_CAP)) / DIMENSION_COVERAGE_NORMALIZER;
        }
    }

    /// GLOSSARY "Gap vector": weighted sum of eigenvectors weighted by
    /// `(1 - coverage)`, faded with cycle progress.
    pub fn gap_vector(&self, fade: f32) -> Option<Embedding> {
        if self.eigenvectors.is_empty() {
            return None;
        }
        let dim = self.eigenvectors[0].len();
        let mut acc = vec![0.0f32; dim];
        for (vector, coverage) in self.eigenvectors.iter().zip(self.coverage.iter()) {
            let weight = (1.0 - coverage).max(0.0) * fade;
            for (a, v) in acc.iter_mut().zip(vector.iter()) {
                *a += v * weight;
            }
        }
        Embedding::normalize(acc)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn label_dimension(eigenvector: &[f32], vocabulary: &HashMap<String, Embedding>) -> Vec<String> {
    let mut scored: Vec<(f32, &String)> = vocabulary
        .iter()
        .map(|(word, embedding)| (dot(embedding.as_slice(), eigenvector), word))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(3).map(|(_, w)| w.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> HashMap<String, Embedding> {
        let mut v = HashMap::new();
        v.insert("decline".to_string(), Embedding::from_unit(vec![1.0, 0.0]).unwrap());
        v.insert("impairment".to_string(), Embedding::from_unit(vec![0.0, 1.0]).unwrap());
        v.insert("cognitive".to_string(), Embedding::normalize(vec![0.7, 0.7]).unwrap());
        v
    }

    #[test]
    fn tracker_yields_at_least_three_components_for_enough_items() {
        let items = vec![
            Embedding::from_unit(vec![1.0, 0.0]).unwrap(),
            Embedding::from_unit(vec![0.0, 1.0]).unwrap(),
            Embedding::normalize(vec![0.5, 0.5]).unwrap(),
            Embedding::normalize(vec![-0.5, 0.5]).unwrap(),
        ];
        let tracker = DimensionTracker::from_outline_embeddings(&items, &vocab()).unwrap();
        assert!(tracker.num_components() >= 3);
    }

    #[test]
    fn labels_are_deterministic_for_fixed_vocabulary() {
        let items = vec![
            Embedding::from_unit(vec![1.0, 0.0]).unwrap(),
            Embedding::from_unit(vec![0.0, 1.0]).unwrap(),
        ];
        let t1 = DimensionTracker::from_outline_embeddings(&items, &vocab()).unwrap();
        let t2 = DimensionTracker::from_outline_embeddings(&items, &vocab()).unwrap();
        assert_eq!(t1.labels(), t2.labels());
    }

    #[test]
    fn coverage_stays_within_zero_one_after_updates() {
        let items = vec![
            Embedding::from_unit(vec![1.0, 0.0]).unwrap(),
            Embedding::from_unit(vec![0.0, 1.0]).unwrap(),
        ];
        let mut tracker = DimensionTracker::from_outline_embeddings(&items, &vocab()).unwrap();
        let content = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        for _ in 0..20 {
            tracker.update_coverage(&content, 1.0);
        }
        for c in tracker.coverage() {
            assert!(*c >= 0.0 && *c <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn empty_outline_yields_no_tracker() {
        assert!(DimensionTracker::from_outline_embeddings(&[], &vocab()).is_none());
    }
}
