use serde::{Deserialize, Serialize};

use crate::core::types::Embedding;

/// Running mean of `(result_centroid − query_centroid)` across cycles
/// (§4.G, GLOSSARY "Trajectory").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryAccumulator {
    query_sum: Vec<f32>,
    result_sum: Vec<f32>,
    weight_total: f32,
    count: u32,
}

impl TrajectoryAccumulator {
    pub fn new(dim: usize) -> Self {
        TrajectoryAccumulator {
            query_sum: vec![0.0; dim],
            result_sum: vec![0.0; dim],
            weight_total: 0.0,
            count: 0,
        }
    }

    /// Adds the centroid of `queries` and the centroid of `results`,
    /// weighted by `weight` (§4.G).
    pub fn add_cycle_data(&mut self, queries: &[Embedding], results: &[Embedding], weight: f32) {
        if let Some(q_centroid) = Embedding::centroid(queries) {
            for (acc, v) in self.query_sum.iter_mut().zip(q_centroid.as_slice()) {
                *acc += v * weight;
            }
        }
        if let Some(r_centroid) = Embedding::centroid(results) {
            for (acc, v) in self.result_sum.iter_mut().zip(r_centroid.as_slice()) {
                *acc += v * weight;
            }
        }
        self.weight_total += weight;
        self.count += 1;
    }

    /// Returns the unit vector of `(result_mean − query_mean)`, or `None` if
    /// no cycles have been recorded or the resulting norm is below 1e-10.
    pub fn get_trajectory(&self) -> Option<Embedding> {
        if self.count == 0 || self.weight_total <= 0.0 {
            return None;
        }
        let diff: Vec<f32> = self
            .result_sum
            .iter()
            .zip(self.query_sum.iter())
            .map(|(r, q)| (r - q) / self.weight_total)
            .collect();
        let norm = (diff.iter().map(|v| v * v).sum::<f32>()).sqrt();
        if norm < 1e-10 {
            return None;
        }
        Embedding::normalize(diff)
    }

    pub fn cycle_count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trajectory_is_none_with_no_cycles() {
        let acc = TrajectoryAccumulator::new(2);
        assert!(acc.get_trajectory().is_none());
    }

    #[test]
    fn trajectory_linearity_order_independent() {
        let queries_a = vec![Embedding::from_unit(vec![1.0, 0.0]).unwrap()];
        let results_a = vec![Embedding::from_unit(vec![0.0, 1.0]).unwrap()];
        let queries_b = vec![Embedding::from_unit(vec![0.0, 1.0]).unwrap()];
        let results_b = vec![Embedding::from_unit(vec![1.0, 0.0]).unwrap()];

        let mut forward = TrajectoryAccumulator::new(2);
        forward.add_cycle_data(&queries_a, &results_a, 1.0);
        forward.add_cycle_data(&queries_b, &results_b, 1.0);

        let mut backward = TrajectoryAccumulator::new(2);
        backward.add_cycle_data(&queries_b, &results_b, 1.0);
        backward.add_cycle_data(&queries_a, &results_a, 1.0);

        assert_eq!(forward.get_trajectory(), backward.get_trajectory());
    }

    #[test]
    fn trajectory_is_none_when_query_equals_result() {
        let mut acc = TrajectoryAccumulator::new(2);
        let e = vec![Embedding::from_unit(vec![1.0, 0.0]).unwrap()];
        acc.add_cycle_data(&e, &e, 1.0);
        assert!(acc.get_trajectory().is_none());
    }
}
