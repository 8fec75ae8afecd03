//! Dual-index storage layer
//!
//! Two append-only vector indices (one per modality) and a slot-addressed
//! metadata store, coordinated by IndexManager so that the shared-slot-id
//! invariant holds: image index size == text index size == metadata count.

mod manager;
mod metadata;
mod vector_index;

pub use manager::IndexManager;
pub use metadata::{MetadataStore, ProductRecord};
pub use vector_index::{IndexState, VectorIndex};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty vector rejected: dimension cannot be fixed at zero")]
    EmptyVector,

    #[error("Slot out of order: expected {expected}, got {got}")]
    SlotOutOfOrder { expected: usize, got: usize },

    #[error(
        "Index stores diverged (image: {image}, text: {text}, metadata: {metadata}); \
         engine state is unrecoverable"
    )]
    Inconsistent {
        image: usize,
        text: usize,
        metadata: usize,
    },

    #[error("Insertion failed: {0}")]
    InsertionFailed(String),
}
