//! Lookalike - Dual-Index Semantic Product Search
//!
//! Stores per-product image and text embeddings in two coupled append-only
//! indices, answers exact nearest-neighbor queries with per-product
//! deduplication and weighted hybrid fusion, and persists both indices plus
//! product metadata as one atomic snapshot.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod persist;
pub mod search;

pub use error::{LookalikeError, Result};
