//! Coordination of both vector indices and the metadata store

use crate::index::{IndexError, MetadataStore, ProductRecord, VectorIndex};

/// Owner of the two vector indices and the metadata store
///
/// All mutation goes through `add_product`, which validates both vectors
/// before touching any store. The three inserts that follow cannot fail for
/// data-dependent reasons, which makes the critical section effectively
/// atomic from the caller's perspective: either nothing is mutated, or all
/// three stores gain the same slot.
pub struct IndexManager {
    image_index: VectorIndex,
    text_index: VectorIndex,
    metadata: MetadataStore,
}

impl IndexManager {
    /// Create an empty manager with no fixed dimensions
    pub fn new() -> Self {
        Self {
            image_index: VectorIndex::new(),
            text_index: VectorIndex::new(),
            metadata: MetadataStore::new(),
        }
    }

    /// Reassemble a manager from snapshot parts, verifying the shared-slot
    /// invariant before accepting the state
    pub fn from_parts(
        image_index: VectorIndex,
        text_index: VectorIndex,
        metadata: MetadataStore,
    ) -> Result<Self, IndexError> {
        let manager = Self {
            image_index,
            text_index,
            metadata,
        };
        manager.verify_consistency()?;
        Ok(manager)
    }

    /// Fail-fast invariant check: all three stores must agree on size
    ///
    /// A divergence indicates a coordination bug, not a recoverable
    /// condition; no auto-repair is attempted.
    pub fn verify_consistency(&self) -> Result<(), IndexError> {
        let image = self.image_index.len();
        let text = self.text_index.len();
        let metadata = self.metadata.count();

        if image != text || text != metadata {
            return Err(IndexError::Inconsistent {
                image,
                text,
                metadata,
            });
        }
        Ok(())
    }

    /// Insert a product into both indices and the metadata store
    ///
    /// Returns the shared slot id. On any validation failure all three
    /// stores are left unchanged.
    pub fn add_product(
        &mut self,
        product_id: &str,
        image_vector: &[f32],
        text_vector: &[f32],
        title: &str,
        description: &str,
        image_path: &str,
    ) -> Result<usize, IndexError> {
        self.verify_consistency()?;

        if product_id.is_empty() {
            return Err(IndexError::InsertionFailed(
                "Product id cannot be empty".to_string(),
            ));
        }

        // Validate both modalities before mutating either index.
        self.image_index.validate(image_vector)?;
        self.text_index.validate(text_vector)?;

        let slot = self.image_index.add(image_vector)?;

        let text_slot = self.text_index.add(text_vector)?;
        if text_slot != slot {
            // The stores have already diverged; surface the fatal state.
            return Err(IndexError::Inconsistent {
                image: self.image_index.len(),
                text: self.text_index.len(),
                metadata: self.metadata.count(),
            });
        }

        self.metadata.put(
            slot,
            ProductRecord {
                product_id: product_id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                image_path: image_path.to_string(),
            },
        )?;

        tracing::debug!(slot, product_id, "Indexed product");

        Ok(slot)
    }

    pub fn image_index(&self) -> &VectorIndex {
        &self.image_index
    }

    pub fn text_index(&self) -> &VectorIndex {
        &self.text_index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn image_count(&self) -> usize {
        self.image_index.len()
    }

    pub fn text_count(&self) -> usize {
        self.text_index.len()
    }

    /// Number of indexed slots (== image == text == metadata counts)
    pub fn product_count(&self) -> usize {
        self.metadata.count()
    }

    pub fn image_dimension(&self) -> Option<usize> {
        self.image_index.dimension()
    }

    pub fn text_dimension(&self) -> Option<usize> {
        self.text_index.dimension()
    }
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(manager: &mut IndexManager, id: &str, image: &[f32], text: &[f32]) -> usize {
        manager
            .add_product(id, image, text, "title", "description", "img.jpg")
            .unwrap()
    }

    #[test]
    fn test_add_product_assigns_shared_slot() {
        let mut manager = IndexManager::new();

        let slot_a = add(&mut manager, "a", &[1.0, 0.0], &[0.0, 1.0, 0.0]);
        let slot_b = add(&mut manager, "b", &[0.0, 1.0], &[1.0, 0.0, 0.0]);

        assert_eq!(slot_a, 0);
        assert_eq!(slot_b, 1);
        assert_eq!(manager.image_count(), 2);
        assert_eq!(manager.text_count(), 2);
        assert_eq!(manager.product_count(), 2);
        assert_eq!(manager.metadata().get(0).unwrap().product_id, "a");
    }

    #[test]
    fn test_modalities_may_have_different_dimensions() {
        let mut manager = IndexManager::new();
        add(&mut manager, "a", &[1.0, 0.0], &[0.0, 1.0, 0.0]);

        assert_eq!(manager.image_dimension(), Some(2));
        assert_eq!(manager.text_dimension(), Some(3));
    }

    #[test]
    fn test_bad_image_vector_leaves_all_stores_unchanged() {
        let mut manager = IndexManager::new();
        add(&mut manager, "a", &[1.0, 0.0], &[0.0, 1.0]);

        let result =
            manager.add_product("b", &[1.0, 0.0, 0.0], &[1.0, 0.0], "t", "d", "i.jpg");
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));

        assert_eq!(manager.image_count(), 1);
        assert_eq!(manager.text_count(), 1);
        assert_eq!(manager.product_count(), 1);
        manager.verify_consistency().unwrap();
    }

    #[test]
    fn test_bad_text_vector_rejected_before_image_insert() {
        let mut manager = IndexManager::new();
        add(&mut manager, "a", &[1.0, 0.0], &[0.0, 1.0]);

        // Image vector is valid, text vector is not; nothing may change.
        let result = manager.add_product("b", &[0.0, 1.0], &[1.0, 0.0, 0.0], "t", "d", "i.jpg");
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));

        assert_eq!(manager.image_count(), 1);
        manager.verify_consistency().unwrap();
    }

    #[test]
    fn test_empty_product_id_rejected() {
        let mut manager = IndexManager::new();
        let result = manager.add_product("", &[1.0], &[1.0], "t", "d", "i.jpg");
        assert!(matches!(result, Err(IndexError::InsertionFailed(_))));
        assert_eq!(manager.product_count(), 0);
    }

    #[test]
    fn test_from_parts_rejects_diverged_stores() {
        let mut image = VectorIndex::new();
        image.add(&[1.0, 0.0]).unwrap();
        let text = VectorIndex::new();
        let metadata = MetadataStore::new();

        let result = IndexManager::from_parts(image, text, metadata);
        assert!(matches!(
            result,
            Err(IndexError::Inconsistent {
                image: 1,
                text: 0,
                metadata: 0
            })
        ));
    }

    #[test]
    fn test_invariant_holds_after_many_inserts() {
        let mut manager = IndexManager::new();
        for i in 0..50 {
            let angle = i as f32 * 0.13;
            add(
                &mut manager,
                &format!("p{}", i % 7),
                &[angle.cos(), angle.sin()],
                &[angle.sin(), angle.cos()],
            );
        }
        manager.verify_consistency().unwrap();
        assert_eq!(manager.product_count(), 50);
    }
}
