//! Append-only exact-similarity vector index
//!
//! Vectors are stored in one contiguous buffer and scored with a single
//! matrix-vector product per query. Inner product equals cosine similarity
//! because every stored vector is unit-norm.

use crate::index::IndexError;
use ndarray::{ArrayView1, ArrayView2};

/// Dimension state of an index
///
/// The dimension is fixed by the first inserted vector and never changes
/// afterwards. The tag is explicit so callers can distinguish "no vector
/// seen yet" from any particular dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Uninitialized,
    Ready { dimension: usize },
}

/// Exact inner-product vector index
///
/// Append-only: no deletion, no update. Slot ids are assigned sequentially
/// from zero in insertion order.
pub struct VectorIndex {
    state: IndexState,
    /// Row-major storage, len == count * dimension
    data: Vec<f32>,
    count: usize,
}

impl VectorIndex {
    /// Create an empty index with no fixed dimension
    pub fn new() -> Self {
        Self {
            state: IndexState::Uninitialized,
            data: Vec::new(),
            count: 0,
        }
    }

    /// Rebuild an index from snapshot parts, validating the shape
    pub fn from_parts(
        dimension: Option<usize>,
        data: Vec<f32>,
        count: usize,
    ) -> Result<Self, IndexError> {
        match dimension {
            None => {
                if count != 0 || !data.is_empty() {
                    return Err(IndexError::InsertionFailed(
                        "Vectors present without a fixed dimension".to_string(),
                    ));
                }
                Ok(Self::new())
            }
            Some(dim) => {
                if dim == 0 {
                    return Err(IndexError::EmptyVector);
                }
                if data.len() != count * dim {
                    return Err(IndexError::DimensionMismatch {
                        expected: count * dim,
                        actual: data.len(),
                    });
                }
                Ok(Self {
                    state: IndexState::Ready { dimension: dim },
                    data,
                    count,
                })
            }
        }
    }

    /// Check a vector against the fixed dimension without mutating anything
    pub fn validate(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        if let IndexState::Ready { dimension } = self.state {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }
        Ok(())
    }

    /// Append a vector, returning its newly assigned slot id
    ///
    /// The first insertion fixes the index dimension.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize, IndexError> {
        self.validate(vector)?;

        if self.state == IndexState::Uninitialized {
            self.state = IndexState::Ready {
                dimension: vector.len(),
            };
        }

        let slot = self.count;
        self.data.extend_from_slice(vector);
        self.count += 1;

        Ok(slot)
    }

    /// Exact top-k search by inner product
    ///
    /// Returns at most k `(slot_id, score)` pairs sorted descending by
    /// score, ties broken by ascending slot id. An empty index returns an
    /// empty list without inspecting the query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, IndexError> {
        let dimension = match self.state {
            IndexState::Uninitialized => return Ok(Vec::new()),
            IndexState::Ready { dimension } => dimension,
        };

        if query.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let matrix = ArrayView2::from_shape((self.count, dimension), &self.data)
            .map_err(|e| IndexError::InsertionFailed(format!("index buffer shape: {}", e)))?;
        let query_view = ArrayView1::from(query);
        let scores = matrix.dot(&query_view);

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        ranked.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        Ok(ranked)
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fixed dimension, if one has been established
    pub fn dimension(&self) -> Option<usize> {
        match self.state {
            IndexState::Uninitialized => None,
            IndexState::Ready { dimension } => Some(dimension),
        }
    }

    /// Raw row-major vector data, for snapshot serialization
    pub fn raw_data(&self) -> &[f32] {
        &self.data
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_fixes_dimension() {
        let mut index = VectorIndex::new();
        assert_eq!(index.dimension(), None);

        let slot = index.add(&[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(index.dimension(), Some(3));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_sequential_slot_ids() {
        let mut index = VectorIndex::new();
        assert_eq!(index.add(&[1.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(&[0.0, 1.0]).unwrap(), 1);
        assert_eq!(index.add(&[1.0, 1.0]).unwrap(), 2);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new();
        index.add(&[1.0, 0.0]).unwrap();

        let result = index.add(&[1.0, 0.0, 0.0]);
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_vector_rejected() {
        let mut index = VectorIndex::new();
        assert!(matches!(index.add(&[]), Err(IndexError::EmptyVector)));
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new();
        let results = index.search(&[1.0, 0.0], 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_ordering() {
        let mut index = VectorIndex::new();
        index.add(&[1.0, 0.0]).unwrap(); // slot 0, score 1.0
        index.add(&[0.0, 1.0]).unwrap(); // slot 1, score 0.0
        index.add(&[0.6, 0.8]).unwrap(); // slot 2, score 0.6

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(results[1].0, 2);
        assert_eq!(results[2].0, 1);
    }

    #[test]
    fn test_search_tie_broken_by_slot() {
        let mut index = VectorIndex::new();
        index.add(&[0.0, 1.0]).unwrap(); // slot 0
        index.add(&[0.0, 1.0]).unwrap(); // slot 1, identical score
        index.add(&[1.0, 0.0]).unwrap(); // slot 2

        let results = index.search(&[0.0, 1.0], 3).unwrap();
        assert_eq!(results[0].0, 0);
        assert_eq!(results[1].0, 1);
        assert_eq!(results[2].0, 2);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let mut index = VectorIndex::new();
        for i in 0..10 {
            let angle = i as f32 * 0.1;
            index.add(&[angle.cos(), angle.sin()]).unwrap();
        }

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_search_query_dimension_checked_when_nonempty() {
        let mut index = VectorIndex::new();
        index.add(&[1.0, 0.0]).unwrap();

        let result = index.search(&[1.0, 0.0, 0.0], 1);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_from_parts_round_trip() {
        let mut index = VectorIndex::new();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();

        let rebuilt =
            VectorIndex::from_parts(index.dimension(), index.raw_data().to_vec(), index.len())
                .unwrap();

        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt.dimension(), Some(2));

        let results = rebuilt.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].0, 0);
    }

    #[test]
    fn test_from_parts_shape_mismatch() {
        let result = VectorIndex::from_parts(Some(3), vec![1.0, 0.0], 1);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_from_parts_uninitialized_with_data() {
        let result = VectorIndex::from_parts(None, vec![1.0], 0);
        assert!(result.is_err());
    }
}
