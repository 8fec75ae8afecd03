//! Slot-addressed product metadata store

use crate::index::IndexError;
use serde::{Deserialize, Serialize};

/// Catalog entry for one indexed slot
///
/// `product_id` is an opaque external identifier and is NOT unique across
/// slots: a product with several photos occupies several slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub image_path: String,
}

/// Append-only mapping from slot id to product record
///
/// Records are stored positionally, so lookup is O(1) and slot ids stay
/// dense and zero-based by construction.
#[derive(Debug, Default)]
pub struct MetadataStore {
    records: Vec<ProductRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Rebuild a store from a snapshot's ordered record list
    pub fn from_records(records: Vec<ProductRecord>) -> Self {
        Self { records }
    }

    /// Insert a record at the next slot
    ///
    /// `slot_id` must equal the current count; anything else means the
    /// caller's coordination is broken.
    pub fn put(&mut self, slot_id: usize, record: ProductRecord) -> Result<(), IndexError> {
        if slot_id != self.records.len() {
            return Err(IndexError::SlotOutOfOrder {
                expected: self.records.len(),
                got: slot_id,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Look up the record for a slot
    pub fn get(&self, slot_id: usize) -> Option<&ProductRecord> {
        self.records.get(slot_id)
    }

    /// Number of stored records
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Ordered record list, for snapshot serialization
    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }
}
