//! Per-product deduplication of raw index hits

use crate::index::{MetadataStore, ProductRecord};
use ahash::AHashMap;

/// A deduplicated search candidate: one product with its best-scoring slot
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub slot: usize,
    pub score: f32,
    pub record: ProductRecord,
}

/// Collapse raw `(slot, score)` hits to at most one candidate per
/// product_id, keeping the highest score.
///
/// Expects `raw` in index search order (descending score, ascending slot),
/// so on equal scores the earliest slot is seen first and retained. A slot
/// with no metadata record is skipped rather than failing the query; the
/// remaining hits are still valid.
pub(crate) fn dedupe_best(raw: Vec<(usize, f32)>, metadata: &MetadataStore) -> Vec<Candidate> {
    let mut best: AHashMap<String, Candidate> = AHashMap::with_capacity(raw.len());

    for (slot, score) in raw {
        let Some(record) = metadata.get(slot) else {
            tracing::warn!(slot, "No metadata record for indexed slot; skipping hit");
            continue;
        };

        match best.get_mut(&record.product_id) {
            Some(existing) if existing.score >= score => {}
            Some(existing) => {
                existing.slot = slot;
                existing.score = score;
            }
            None => {
                best.insert(
                    record.product_id.clone(),
                    Candidate {
                        slot,
                        score,
                        record: record.clone(),
                    },
                );
            }
        }
    }

    best.into_values().collect()
}

/// Order candidates descending by score, ties by ascending slot id, and
/// keep the first `top_k`.
pub(crate) fn rank_truncate(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    candidates.sort_unstable_by(|a, b| b.score.total_cmp(&a.score).then(a.slot.cmp(&b.slot)));
    candidates.truncate(top_k);
    candidates
}
