use nalgebra::DMatrix;

use crate::core::constants::{GAP_EXPLORATION_WEIGHT, TRAJECTORY_MOMENTUM, TRANSFORM_WEIGHT_CEILING};
use crate::core::types::Embedding;

use super::dimension::DimensionTracker;
use super::pdv::PdvResult;

/// Symmetric transformation matrix biasing embedding similarity toward the
/// PDV, trajectory, and gap directions while preserving variance along the
/// tracked eigenvectors (§4.I, GLOSSARY "Semantic transformation").
pub struct SemanticTransformer {
    matrix: DMatrix<f32>,
}

/// Inputs needed to build the transform for a given cycle, bundled so the
/// weight-fade computation (§4.I) has everything it needs in one place.
pub struct TransformInputs<'a> {
    pub dimensions: &'a DimensionTracker,
    pub pdv: &'a PdvResult,
    pub trajectory: Option<&'a Embedding>,
    pub gap: Option<&'a Embedding>,
    pub cycle_index: u32,
    pub max_cycles: u32,
}

impl SemanticTransformer {
    pub fn build(inputs: &TransformInputs, dim: usize) -> Self {
        let mut matrix = DMatrix::<f32>::identity(dim, dim);

        for (eigenvector, weight) in inputs
            .dimensions
            .eigenvectors()
            .iter()
            .zip(inputs.dimensions.explained_variance())
        {
            add_outer_product(&mut matrix, eigenvector, weight * 2.0);
        }

        let (pdv_weight, traj_weight, gap_weight) = Self::compute_weights(inputs);

        if let (Some(pdv), w) = (&inputs.pdv.pdv, pdv_weight) {
            if w > 0.0 {
                add_outer_product(&mut matrix, pdv.as_slice(), w);
            }
        }
        if let (Some(traj), w) = (inputs.trajectory, traj_weight) {
            if w > 0.0 {
                add_outer_product(&mut matrix, traj.as_slice(), w);
            }
        }
        if let (Some(gap), w) = (inputs.gap, gap_weight) {
            if w > 0.0 {
                add_outer_product(&mut matrix, gap.as_slice(), w);
            }
        }

        SemanticTransformer { matrix }
    }

    /// Computes `(pdv_weight, traj_weight, gap_weight)` per §4.I: PDV fades
    /// after 1/3 of max cycles, gap fades linearly to zero after 1/2 of max
    /// cycles, trajectory is constant. If the sum exceeds
    /// [`TRANSFORM_WEIGHT_CEILING`], all three are scaled down proportionally.
    fn compute_weights(inputs: &TransformInputs) -> (f32, f32, f32) {
        let max_cycles = inputs.max_cycles.max(1) as f32;
        let cycle = inputs.cycle_index as f32;

        let pdv_fade_start = max_cycles / 3.0;
        let pdv_weight = if cycle <= pdv_fade_start {
            inputs.pdv.strength * inputs.pdv.impact
        } else {
            let remaining = (max_cycles - cycle).max(0.0);
            let fade_window = (max_cycles - pdv_fade_start).max(1.0);
            inputs.pdv.strength * inputs.pdv.impact * (remaining / fade_window).clamp(0.0, 1.0)
        };

        let traj_weight = TRAJECTORY_MOMENTUM;

        let gap_fade_start = max_cycles / 2.0;
        let gap_weight = if cycle <= gap_fade_start {
            GAP_EXPLORATION_WEIGHT
        } else {
            let remaining = (max_cycles - cycle).max(0.0);
            let fade_window = (max_cycles - gap_fade_start).max(1.0);
            GAP_EXPLORATION_WEIGHT * (remaining / fade_window).clamp(0.0, 1.0)
        };

        let sum = pdv_weight + traj_weight + gap_weight;
        if sum > TRANSFORM_WEIGHT_CEILING && sum > 0.0 {
            let scale = TRANSFORM_WEIGHT_CEILING / sum;
            (pdv_weight * scale, traj_weight * scale, gap_weight * scale)
        } else {
            (pdv_weight, traj_weight, gap_weight)
        }
    }

    /// `T(v) = unit(v · T)`; if the result has any NaN/Inf or near-zero
    /// norm, `v` is returned unchanged (§4.I).
    pub fn apply(&self, v: &Embedding) -> Embedding {
        let input = nalgebra::DVector::from_row_slice(v.as_slice());
        let transformed = &self.matrix * input;
        let raw: Vec<f32> = transformed.iter().copied().collect();

        if raw.iter().any(|x| !x.is_finite()) {
            return v.clone();
        }

        match Embedding::normalize(raw) {
            Some(unit) => unit,
            None => v.clone(),
        }
    }
}

fn add_outer_product(matrix: &mut DMatrix<f32>, vector: &[f32], weight: f32) {
    let dim = matrix.nrows();
    for r in 0..dim {
        for c in 0..dim {
            matrix[(r, c)] += weight * vector[r] * vector[c];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::dimension::DimensionTracker;
    use std::collections::HashMap;

    fn simple_tracker() -> DimensionTracker {
        let items = vec![
            Embedding::from_unit(vec![1.0, 0.0]).unwrap(),
            Embedding::from_unit(vec![0.0, 1.0]).unwrap(),
        ];
        DimensionTracker::from_outline_embeddings(&items, &HashMap::new()).unwrap()
    }

    #[test]
    fn apply_returns_unit_norm_or_unchanged() {
        let tracker = simple_tracker();
        let pdv = PdvResult {
            pdv: None,
            strength: 0.0,
            impact: 0.0,
        };
        let inputs = TransformInputs {
            dimensions: &tracker,
            pdv: &pdv,
            trajectory: None,
            gap: None,
            cycle_index: 1,
            max_cycles: 6,
        };
        let transformer = SemanticTransformer::build(&inputs, 2);
        let v = Embedding::from_unit(vec![1.0, 0.0]).unwrap();
        let out = transformer.apply(&v);
        let norm: f32 = out.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || out == v);
    }

    #[test]
    fn weight_sum_never_exceeds_ceiling() {
        let tracker = simple_tracker();
        let pdv = PdvResult {
            pdv: Some(Embedding::from_unit(vec![1.0, 0.0]).unwrap()),
            strength: 5.0,
            impact: 1.0,
        };
        let trajectory = Embedding::from_unit(vec![0.0, 1.0]).unwrap();
        let inputs = TransformInputs {
            dimensions: &tracker,
            pdv: &pdv,
            trajectory: Some(&trajectory),
            gap: None,
            cycle_index: 1,
            max_cycles: 6,
        };
        let (pdv_w, traj_w, gap_w) = SemanticTransformer::compute_weights(&inputs);
        assert!(pdv_w + traj_w + gap_w <= TRANSFORM_WEIGHT_CEILING + 1e-5);
    }
}
