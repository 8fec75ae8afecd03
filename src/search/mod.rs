//! Query engine: single-modality search, deduplication, and hybrid fusion
//!
//! Every public operation is stateless request/response. Rankings are fully
//! deterministic: descending score, ties broken by ascending slot id, so an
//! identical query against unchanged state yields identical output.

mod dedup;
mod engine;
mod fusion;

pub use engine::{EngineStats, SearchEngine};

use crate::index::IndexError;
use serde::Serialize;
use thiserror::Error;

/// Over-fetch multiplier for single-modality search; leaves room for
/// collapsing multiple slots of the same product into one result.
pub(crate) const OVERFETCH_FACTOR: usize = 3;

/// Candidate-pool multiplier per modality for hybrid fusion.
pub(crate) const HYBRID_POOL_FACTOR: usize = 2;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Engine busy: could not acquire lock for {operation} within the deadline")]
    Busy { operation: &'static str },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Result of a single-modality search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub image_path: String,
    /// Cosine similarity in [-1, 1], higher is more similar
    pub score: f32,
}

/// Result of a hybrid (weighted text+image) search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridHit {
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub image_path: String,
    /// Weighted sum of the two components
    pub hybrid_score: f32,
    /// `text_score * text_weight`, 0 when absent from the text pool
    pub text_component: f32,
    /// `image_score * (1 - text_weight)`, 0 when absent from the image pool
    pub image_component: f32,
}
