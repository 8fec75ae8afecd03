//! Search engine facade: lock discipline and the public operations

use crate::error::{LookalikeError, Result};
use crate::index::{IndexManager, MetadataStore, VectorIndex};
use crate::persist::SnapshotStore;
use crate::search::dedup::{dedupe_best, rank_truncate, Candidate};
use crate::search::fusion::weighted_fusion;
use crate::search::{
    HybridHit, SearchError, SearchHit, HYBRID_POOL_FACTOR, OVERFETCH_FACTOR,
};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Engine counters for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub products: usize,
    pub image_dimension: Option<usize>,
    pub text_dimension: Option<usize>,
}

/// The dual-index search engine
///
/// Owns the IndexManager behind a single-writer multiple-reader lock:
/// `add_product`, `save`, and `load` serialize behind the write lock, the
/// three search operations share the read lock. Every acquisition is
/// bounded by the configured timeout; a lock that cannot be acquired in
/// time fails with a retryable `Busy` instead of stalling the caller
/// behind a slow writer.
///
/// Query encoding is the caller's job and happens outside any lock.
pub struct SearchEngine {
    manager: RwLock<IndexManager>,
    snapshots: SnapshotStore,
    lock_timeout: Duration,
}

impl SearchEngine {
    /// Create an empty engine
    pub fn new(snapshots: SnapshotStore, lock_timeout: Duration) -> Self {
        Self {
            manager: RwLock::new(IndexManager::new()),
            snapshots,
            lock_timeout,
        }
    }

    async fn read_lock(
        &self,
        operation: &'static str,
    ) -> std::result::Result<RwLockReadGuard<'_, IndexManager>, SearchError> {
        tokio::time::timeout(self.lock_timeout, self.manager.read())
            .await
            .map_err(|_| SearchError::Busy { operation })
    }

    async fn write_lock(
        &self,
        operation: &'static str,
    ) -> std::result::Result<RwLockWriteGuard<'_, IndexManager>, SearchError> {
        tokio::time::timeout(self.lock_timeout, self.manager.write())
            .await
            .map_err(|_| SearchError::Busy { operation })
    }

    /// Insert a product into both indices and the metadata store
    ///
    /// Both vectors must be unit-norm and match their modality's fixed
    /// dimension. Returns the shared slot id.
    pub async fn add_product(
        &self,
        product_id: &str,
        image_vector: &[f32],
        text_vector: &[f32],
        title: &str,
        description: &str,
        image_path: &str,
    ) -> Result<usize> {
        let mut manager = self.write_lock("add_product").await.map_err(LookalikeError::from)?;
        let slot = manager.add_product(
            product_id,
            image_vector,
            text_vector,
            title,
            description,
            image_path,
        )?;
        Ok(slot)
    }

    /// Top-k products most similar to an image query vector
    pub async fn search_by_image(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<SearchHit>, SearchError> {
        let manager = self.read_lock("search_by_image").await?;
        manager.verify_consistency()?;

        let candidates =
            Self::single_modality(manager.image_index(), manager.metadata(), query_vector, top_k)?;
        Ok(candidates.into_iter().map(Self::to_hit).collect())
    }

    /// Top-k products most similar to a text query vector
    pub async fn search_by_text(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<SearchHit>, SearchError> {
        let manager = self.read_lock("search_by_text").await?;
        manager.verify_consistency()?;

        let candidates =
            Self::single_modality(manager.text_index(), manager.metadata(), query_vector, top_k)?;
        Ok(candidates.into_iter().map(Self::to_hit).collect())
    }

    /// Weighted text+image search
    ///
    /// With both vectors supplied, fetches a 2x candidate pool per modality
    /// and fuses scores by `text_weight`. With exactly one vector, the call
    /// delegates to that modality's single search; no fusion and no
    /// weighting, so the ranked list is identical to the single-modality
    /// result.
    pub async fn hybrid_search(
        &self,
        text_vector: Option<&[f32]>,
        image_vector: Option<&[f32]>,
        top_k: usize,
        text_weight: f32,
    ) -> std::result::Result<Vec<HybridHit>, SearchError> {
        if !text_weight.is_finite() || !(0.0..=1.0).contains(&text_weight) {
            return Err(SearchError::InvalidQuery(format!(
                "text_weight must be within [0, 1], got {}",
                text_weight
            )));
        }

        let (text_query, image_query) = match (text_vector, image_vector) {
            (None, None) => {
                return Err(SearchError::InvalidQuery(
                    "Hybrid search requires at least one query vector".to_string(),
                ));
            }
            (Some(t), None) => {
                let hits = self.search_by_text(t, top_k).await?;
                return Ok(hits
                    .into_iter()
                    .map(|hit| Self::single_modality_hybrid(hit, true))
                    .collect());
            }
            (None, Some(i)) => {
                let hits = self.search_by_image(i, top_k).await?;
                return Ok(hits
                    .into_iter()
                    .map(|hit| Self::single_modality_hybrid(hit, false))
                    .collect());
            }
            (Some(t), Some(i)) => (t, i),
        };

        let manager = self.read_lock("hybrid_search").await?;
        manager.verify_consistency()?;

        let pool_k = top_k.saturating_mul(HYBRID_POOL_FACTOR);
        let text_pool =
            Self::single_modality(manager.text_index(), manager.metadata(), text_query, pool_k)?;
        let image_pool =
            Self::single_modality(manager.image_index(), manager.metadata(), image_query, pool_k)?;

        let mut fused = weighted_fusion(text_pool, image_pool, text_weight);
        fused.truncate(top_k);

        Ok(fused
            .into_iter()
            .map(|c| HybridHit {
                product_id: c.record.product_id,
                title: c.record.title,
                description: c.record.description,
                image_path: c.record.image_path,
                hybrid_score: c.hybrid_score,
                text_component: c.text_component,
                image_component: c.image_component,
            })
            .collect())
    }

    /// Persist a consistent snapshot of the engine state
    pub async fn save(&self) -> Result<()> {
        let manager = self.write_lock("save").await.map_err(LookalikeError::from)?;
        manager.verify_consistency()?;
        self.snapshots.save(&manager)?;
        Ok(())
    }

    /// Restore engine state from the snapshot, if one exists
    ///
    /// A missing snapshot is a normal fresh deployment: the engine stays
    /// empty and `false` is returned. A present but corrupt snapshot is an
    /// error.
    pub async fn load(&self) -> Result<bool> {
        let mut manager = self.write_lock("load").await.map_err(LookalikeError::from)?;
        match self.snapshots.load()? {
            Some(restored) => {
                tracing::info!(products = restored.product_count(), "Restored snapshot");
                *manager = restored;
                Ok(true)
            }
            None => {
                tracing::info!("No snapshot found; starting with an empty engine");
                *manager = IndexManager::new();
                Ok(false)
            }
        }
    }

    /// Current engine counters
    pub async fn stats(&self) -> Result<EngineStats> {
        let manager = self.read_lock("stats").await.map_err(LookalikeError::from)?;
        manager.verify_consistency()?;
        Ok(EngineStats {
            products: manager.product_count(),
            image_dimension: manager.image_dimension(),
            text_dimension: manager.text_dimension(),
        })
    }

    /// Shared single-modality pipeline: over-fetch, hydrate, dedupe, rank.
    fn single_modality(
        index: &VectorIndex,
        metadata: &MetadataStore,
        query: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<Candidate>, SearchError> {
        if index.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let search_k = top_k.saturating_mul(OVERFETCH_FACTOR).min(index.len());
        let raw = index.search(query, search_k)?;
        let candidates = dedupe_best(raw, metadata);
        Ok(rank_truncate(candidates, top_k))
    }

    fn to_hit(candidate: Candidate) -> SearchHit {
        SearchHit {
            product_id: candidate.record.product_id,
            title: candidate.record.title,
            description: candidate.record.description,
            image_path: candidate.record.image_path,
            score: candidate.score,
        }
    }

    fn single_modality_hybrid(hit: SearchHit, from_text: bool) -> HybridHit {
        HybridHit {
            product_id: hit.product_id,
            title: hit.title,
            description: hit.description,
            image_path: hit.image_path,
            hybrid_score: hit.score,
            text_component: if from_text { hit.score } else { 0.0 },
            image_component: if from_text { 0.0 } else { hit.score },
        }
    }
}
