//! Weighted score fusion for hybrid text+image search
//!
//! Linear combination of per-modality cosine scores:
//! `hybrid = text_score * w + image_score * (1 - w)`. Both encoders emit
//! scores in [-1, 1] but with different effective distributions, so `w` is
//! a calibration knob, not a probability.

use crate::index::ProductRecord;
use crate::search::dedup::Candidate;
use ahash::AHashMap;

/// A fused hybrid candidate with per-modality score attribution
#[derive(Debug, Clone)]
pub(crate) struct FusedCandidate {
    /// Earliest contributing slot, used for deterministic tie-breaks
    pub slot: usize,
    pub text_component: f32,
    pub image_component: f32,
    pub hybrid_score: f32,
    pub record: ProductRecord,
}

/// Union both candidate pools by product_id and compute weighted scores.
///
/// A product absent from one pool contributes 0 for that component. Output
/// is sorted descending by hybrid score, ties broken by ascending slot id.
pub(crate) fn weighted_fusion(
    text_pool: Vec<Candidate>,
    image_pool: Vec<Candidate>,
    text_weight: f32,
) -> Vec<FusedCandidate> {
    let mut fused: AHashMap<String, FusedCandidate> =
        AHashMap::with_capacity(text_pool.len() + image_pool.len());

    for candidate in text_pool {
        fused.insert(
            candidate.record.product_id.clone(),
            FusedCandidate {
                slot: candidate.slot,
                text_component: candidate.score * text_weight,
                image_component: 0.0,
                hybrid_score: 0.0,
                record: candidate.record,
            },
        );
    }

    for candidate in image_pool {
        let component = candidate.score * (1.0 - text_weight);
        match fused.get_mut(&candidate.record.product_id) {
            Some(existing) => {
                existing.image_component = component;
                existing.slot = existing.slot.min(candidate.slot);
            }
            None => {
                fused.insert(
                    candidate.record.product_id.clone(),
                    FusedCandidate {
                        slot: candidate.slot,
                        text_component: 0.0,
                        image_component: component,
                        hybrid_score: 0.0,
                        record: candidate.record,
                    },
                );
            }
        }
    }

    let mut results: Vec<FusedCandidate> = fused
        .into_values()
        .map(|mut c| {
            c.hybrid_score = c.text_component + c.image_component;
            c
        })
        .collect();

    results.sort_unstable_by(|a, b| {
        b.hybrid_score
            .total_cmp(&a.hybrid_score)
            .then(a.slot.cmp(&b.slot))
    });

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(slot: usize, id: &str, score: f32) -> Candidate {
        Candidate {
            slot,
            score,
            record: ProductRecord {
                product_id: id.to_string(),
                title: format!("Product {}", id),
                description: String::new(),
                image_path: String::new(),
            },
        }
    }

    #[test]
    fn test_weighted_components() {
        let text = vec![candidate(0, "a", 0.8)];
        let image = vec![candidate(0, "a", 0.4)];

        let fused = weighted_fusion(text, image, 0.5);

        assert_eq!(fused.len(), 1);
        assert!((fused[0].text_component - 0.4).abs() < 1e-6);
        assert!((fused[0].image_component - 0.2).abs() < 1e-6);
        assert!((fused[0].hybrid_score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_absent_modality_contributes_zero() {
        let text = vec![candidate(0, "a", 0.9)];
        let image = vec![candidate(1, "b", 0.9)];

        let fused = weighted_fusion(text, image, 0.7);

        assert_eq!(fused.len(), 2);
        let a = fused.iter().find(|c| c.record.product_id == "a").unwrap();
        let b = fused.iter().find(|c| c.record.product_id == "b").unwrap();
        assert_eq!(a.image_component, 0.0);
        assert_eq!(b.text_component, 0.0);
        assert!((a.hybrid_score - 0.63).abs() < 1e-6);
        assert!((b.hybrid_score - 0.27).abs() < 1e-5);
    }

    #[test]
    fn test_tie_broken_by_insertion_order() {
        // A: text 0.8, image 0.4; B: text 0.2, image 1.0; w = 0.5
        // Both fuse to 0.6; A holds the earlier slot and must rank first.
        let text = vec![candidate(0, "a", 0.8), candidate(1, "b", 0.2)];
        let image = vec![candidate(1, "b", 1.0), candidate(0, "a", 0.4)];

        let fused = weighted_fusion(text, image, 0.5);

        assert!((fused[0].hybrid_score - fused[1].hybrid_score).abs() < 1e-6);
        assert_eq!(fused[0].record.product_id, "a");
        assert_eq!(fused[1].record.product_id, "b");
    }

    #[test]
    fn test_extreme_weights() {
        let text = vec![candidate(0, "a", 0.9)];
        let image = vec![candidate(1, "b", 0.9)];

        let all_text = weighted_fusion(text.clone(), image.clone(), 1.0);
        assert_eq!(all_text[0].record.product_id, "a");
        assert_eq!(all_text[0].image_component, 0.0);

        let all_image = weighted_fusion(text, image, 0.0);
        assert_eq!(all_image[0].record.product_id, "b");
        assert_eq!(all_image[0].text_component, 0.0);
    }

    #[test]
    fn test_slot_takes_earliest_across_pools() {
        let text = vec![candidate(5, "a", 0.5)];
        let image = vec![candidate(2, "a", 0.5)];

        let fused = weighted_fusion(text, image, 0.5);
        assert_eq!(fused[0].slot, 2);
    }
}
