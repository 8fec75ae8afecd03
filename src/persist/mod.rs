//! Atomic snapshot persistence for the dual-index engine
//!
//! A snapshot is a directory holding one zstd-compressed JSON artifact per
//! vector index, one for the metadata store, and a manifest carrying the
//! format version, counts, and a BLAKE3 checksum per artifact. The whole
//! set is written to a temporary directory and renamed into place, so a
//! crash mid-write never leaves a half-written snapshot visible to load.
//! All three artifacts are versioned together: any cross-artifact mismatch
//! at load time is corruption, not a usable partial state.

use crate::index::{IndexManager, MetadataStore, ProductRecord, VectorIndex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FORMAT_VERSION: u32 = 1;
const MANIFEST_FILE: &str = "manifest.json";
const IMAGE_INDEX_FILE: &str = "image_index.json.zst";
const TEXT_INDEX_FILE: &str = "text_index.json.zst";
const METADATA_FILE: &str = "metadata.json.zst";
const ZSTD_LEVEL: i32 = 3;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Reference to one artifact inside the snapshot directory
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactRef {
    file: String,
    checksum: String,
}

/// Snapshot manifest, written last and read first
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    created_at: String,
    product_count: usize,
    image_dimension: Option<usize>,
    text_dimension: Option<usize>,
    image_index: ArtifactRef,
    text_index: ArtifactRef,
    metadata: ArtifactRef,
}

/// Serialized form of one vector index
#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    dimension: Option<usize>,
    count: usize,
    vectors: Vec<f32>,
}

impl IndexArtifact {
    fn capture(index: &VectorIndex) -> Self {
        Self {
            dimension: index.dimension(),
            count: index.len(),
            vectors: index.raw_data().to_vec(),
        }
    }
}

/// Serialized form of the metadata store
#[derive(Debug, Serialize, Deserialize)]
struct MetadataArtifact {
    records: Vec<ProductRecord>,
}

/// Durable snapshot storage for the engine state
pub struct SnapshotStore {
    snapshot_dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at the given snapshot directory
    pub fn new(snapshot_dir: PathBuf) -> Self {
        Self { snapshot_dir }
    }

    /// Serialize the full engine state and swap it into place atomically
    pub fn save(&self, manager: &IndexManager) -> Result<(), SnapshotError> {
        let tmp_dir = self.sibling_dir("snapshot.tmp");
        let old_dir = self.sibling_dir("snapshot.old");

        // Leftovers from an interrupted save or swap are dead weight.
        remove_dir_if_present(&tmp_dir)?;
        remove_dir_if_present(&old_dir)?;

        fs::create_dir_all(&tmp_dir).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to create snapshot temp dir: {}", tmp_dir.display()),
        })?;

        let image_index = write_artifact(
            &tmp_dir,
            IMAGE_INDEX_FILE,
            &IndexArtifact::capture(manager.image_index()),
        )?;
        let text_index = write_artifact(
            &tmp_dir,
            TEXT_INDEX_FILE,
            &IndexArtifact::capture(manager.text_index()),
        )?;
        let metadata = write_artifact(
            &tmp_dir,
            METADATA_FILE,
            &MetadataArtifact {
                records: manager.metadata().records().to_vec(),
            },
        )?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            created_at: chrono::Utc::now().to_rfc3339(),
            product_count: manager.product_count(),
            image_dimension: manager.image_dimension(),
            text_dimension: manager.text_dimension(),
            image_index,
            text_index,
            metadata,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        write_file_synced(&tmp_dir.join(MANIFEST_FILE), &manifest_bytes)?;

        // Swap: the live directory is always either the old complete
        // snapshot or the new one, never a mix.
        if self.snapshot_dir.exists() {
            fs::rename(&self.snapshot_dir, &old_dir).map_err(|e| SnapshotError::Io {
                source: e,
                context: format!(
                    "Failed to move previous snapshot aside: {}",
                    self.snapshot_dir.display()
                ),
            })?;
        }
        fs::rename(&tmp_dir, &self.snapshot_dir).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!(
                "Failed to move snapshot into place: {} -> {}",
                tmp_dir.display(),
                self.snapshot_dir.display()
            ),
        })?;
        remove_dir_if_present(&old_dir)?;

        tracing::info!(
            products = manager.product_count(),
            path = %self.snapshot_dir.display(),
            "Saved snapshot"
        );

        Ok(())
    }

    /// Load the engine state from the snapshot directory
    ///
    /// Returns `Ok(None)` when no snapshot exists (a fresh deployment).
    /// A snapshot that exists but cannot be read back consistently is an
    /// error; orphaned vectors must never load silently.
    pub fn load(&self) -> Result<Option<IndexManager>, SnapshotError> {
        if !self.snapshot_dir.exists() {
            return Ok(None);
        }

        let manifest_path = self.snapshot_dir.join(MANIFEST_FILE);
        let manifest_bytes = fs::read(&manifest_path).map_err(|e| {
            SnapshotError::Corrupt(format!(
                "Cannot read manifest {}: {}",
                manifest_path.display(),
                e
            ))
        })?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| SnapshotError::Corrupt(format!("Cannot parse manifest: {}", e)))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(SnapshotError::Corrupt(format!(
                "Unsupported snapshot format version {} (expected {})",
                manifest.format_version, FORMAT_VERSION
            )));
        }

        let image_artifact: IndexArtifact =
            read_artifact(&self.snapshot_dir, &manifest.image_index)?;
        let text_artifact: IndexArtifact = read_artifact(&self.snapshot_dir, &manifest.text_index)?;
        let metadata_artifact: MetadataArtifact =
            read_artifact(&self.snapshot_dir, &manifest.metadata)?;

        let counts = [
            image_artifact.count,
            text_artifact.count,
            metadata_artifact.records.len(),
            manifest.product_count,
        ];
        if counts.iter().any(|&c| c != counts[0]) {
            return Err(SnapshotError::Corrupt(format!(
                "Artifact counts disagree: image {}, text {}, metadata {}, manifest {}",
                counts[0], counts[1], counts[2], counts[3]
            )));
        }

        let image_index =
            VectorIndex::from_parts(image_artifact.dimension, image_artifact.vectors, image_artifact.count)
                .map_err(|e| SnapshotError::Corrupt(format!("Image index: {}", e)))?;
        let text_index =
            VectorIndex::from_parts(text_artifact.dimension, text_artifact.vectors, text_artifact.count)
                .map_err(|e| SnapshotError::Corrupt(format!("Text index: {}", e)))?;
        let metadata = MetadataStore::from_records(metadata_artifact.records);

        let manager = IndexManager::from_parts(image_index, text_index, metadata)
            .map_err(|e| SnapshotError::Corrupt(e.to_string()))?;

        Ok(Some(manager))
    }

    fn sibling_dir(&self, name: &str) -> PathBuf {
        match self.snapshot_dir.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:.32}", blake3::hash(bytes).to_hex())
}

fn write_file_synced(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    let mut file = fs::File::create(path).map_err(|e| SnapshotError::Io {
        source: e,
        context: format!("Failed to create snapshot file: {}", path.display()),
    })?;
    file.write_all(bytes).map_err(|e| SnapshotError::Io {
        source: e,
        context: format!("Failed to write snapshot file: {}", path.display()),
    })?;
    file.sync_all().map_err(|e| SnapshotError::Io {
        source: e,
        context: format!("Failed to sync snapshot file: {}", path.display()),
    })?;
    Ok(())
}

fn write_artifact<T: Serialize>(
    dir: &Path,
    file_name: &str,
    artifact: &T,
) -> Result<ArtifactRef, SnapshotError> {
    let json =
        serde_json::to_vec(artifact).map_err(|e| SnapshotError::Serialization(e.to_string()))?;
    let compressed = zstd::encode_all(&json[..], ZSTD_LEVEL).map_err(|e| SnapshotError::Io {
        source: e,
        context: format!("Failed to compress artifact {}", file_name),
    })?;

    write_file_synced(&dir.join(file_name), &compressed)?;

    Ok(ArtifactRef {
        file: file_name.to_string(),
        checksum: checksum(&compressed),
    })
}

fn read_artifact<T: for<'de> Deserialize<'de>>(
    dir: &Path,
    artifact: &ArtifactRef,
) -> Result<T, SnapshotError> {
    let path = dir.join(&artifact.file);
    let compressed = fs::read(&path).map_err(|e| {
        SnapshotError::Corrupt(format!("Cannot read artifact {}: {}", path.display(), e))
    })?;

    if checksum(&compressed) != artifact.checksum {
        return Err(SnapshotError::Corrupt(format!(
            "Checksum mismatch for artifact {}",
            artifact.file
        )));
    }

    let json = zstd::decode_all(&compressed[..]).map_err(|e| {
        SnapshotError::Corrupt(format!("Cannot decompress artifact {}: {}", artifact.file, e))
    })?;
    serde_json::from_slice(&json).map_err(|e| {
        SnapshotError::Corrupt(format!("Cannot parse artifact {}: {}", artifact.file, e))
    })
}

fn remove_dir_if_present(dir: &Path) -> Result<(), SnapshotError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| SnapshotError::Io {
            source: e,
            context: format!("Failed to remove directory: {}", dir.display()),
        })?;
    }
    Ok(())
}
