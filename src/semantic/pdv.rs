use crate::core::types::Embedding;

/// `{ pdv, strength, impact }` computed from kept/removed topic embeddings
/// (§4.H, GLOSSARY "PDV").
#[derive(Debug, Clone)]
pub struct PdvResult {
    pub pdv: Option<Embedding>,
    pub strength: f32,
    pub impact: f32,
}

/// `rest_count` is the number of outline items in neither `kept` nor
/// `removed`, used for the impact denominator `|R| / |K ∪ R ∪ rest|`.
pub fn compute_pdv(kept: &[Embedding], removed: &[Embedding], rest_count: usize) -> PdvResult {
    if kept.is_empty() || removed.is_empty() {
        return PdvResult {
            pdv: None,
            strength: 0.0,
            impact: 0.0,
        };
    }

    let mu_k = Embedding::centroid(kept);
    let mu_r = Embedding::centroid(removed);

    let (mu_k, mu_r) = match (mu_k, mu_r) {
        (Some(k), Some(r)) => (k, r),
        _ => {
            return PdvResult {
                pdv: None,
                strength: 0.0,
                impact: 0.0,
            }
        }
    };

    let diff: Vec<f32> = mu_k
        .as_slice()
        .iter()
        .zip(mu_r.as_slice().iter())
        .map(|(k, r)| k - r)
        .collect();
    let strength = (diff.iter().map(|v| v * v).sum::<f32>()).sqrt();
    let pdv = Embedding::normalize(diff);

    let universe = kept.len() + removed.len() + rest_count;
    let impact = if universe == 0 {
        0.0
    } else {
        removed.len() as f32 / universe as f32
    };

    PdvResult { pdv, strength, impact }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sets_yield_no_pdv_and_zero_impact() {
        let result = compute_pdv(&[], &[], 5);
        assert!(result.pdv.is_none());
        assert_eq!(result.impact, 0.0);
    }

    #[test]
    fn pdv_is_idempotent_over_same_sets() {
        let kept = vec![Embedding::from_unit(vec![1.0, 0.0]).unwrap()];
        let removed = vec![Embedding::from_unit(vec![0.0, 1.0]).unwrap()];
        let first = compute_pdv(&kept, &removed, 2);
        let second = compute_pdv(&kept, &removed, 2);
        assert_eq!(first.pdv, second.pdv);
        assert_eq!(first.strength, second.strength);
        assert_eq!(first.impact, second.impact);
    }

    #[test]
    fn pdv_points_from_removed_centroid_toward_kept_centroid() {
        let kept = vec![Embedding::from_unit(vec![1.0, 0.0]).unwrap()];
        let removed = vec![Embedding::from_unit(vec![-1.0, 0.0]).unwrap()];
        let result = compute_pdv(&kept, &removed, 0);
        let pdv = result.pdv.unwrap();
        assert!(pdv.as_slice()[0] > 0.0);
    }
}
