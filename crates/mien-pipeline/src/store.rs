//! JSON-file gallery persistence.

use std::path::{Path, PathBuf};

use mien_core::{Descriptor, Identity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("gallery JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("identity '{name}': vector {index} has {len} values (expected 16)")]
    InvalidVectorLen {
        name: String,
        index: usize,
        len: usize,
    },
    #[error("gallery I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for corrupt-data failures, false for I/O failures.
    ///
    /// Corrupt persisted data is surfaced to the caller, which decides
    /// between an explicit user-initiated clear and aborting; it is never
    /// repaired, truncated, or silently dropped here.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StoreError::Json(_) | StoreError::InvalidVectorLen { .. }
        )
    }
}

/// Wire record: one enrolled identity as stored on disk.
#[derive(Serialize, Deserialize)]
struct IdentityRecord {
    name: String,
    vectors: Vec<Vec<f32>>,
}

/// File-backed gallery store.
///
/// The persisted format is a UTF-8 JSON array of
/// `{ "name": ..., "vectors": [[f0..f15], ...] }` records, in gallery
/// order. `save_all` overwrites the whole file each time; the in-memory
/// gallery remains the source of truth while the process is alive.
pub struct GalleryStore {
    path: PathBuf,
}

impl GalleryStore {
    /// Create a store over the given file path, creating parent
    /// directories as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every persisted identity, in stored order.
    ///
    /// A missing file is the first-run case and yields an empty gallery.
    /// Malformed data fails the whole load.
    pub fn load_all(&self) -> Result<Vec<Identity>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let records: Vec<IdentityRecord> = serde_json::from_str(&text)?;

        let mut identities = Vec::with_capacity(records.len());
        for record in records {
            let mut descriptors = Vec::with_capacity(record.vectors.len());
            for (index, vector) in record.vectors.iter().enumerate() {
                let descriptor = Descriptor::from_slice(vector).ok_or_else(|| {
                    StoreError::InvalidVectorLen {
                        name: record.name.clone(),
                        index,
                        len: vector.len(),
                    }
                })?;
                descriptors.push(descriptor);
            }
            identities.push(Identity {
                name: record.name,
                descriptors,
            });
        }

        tracing::debug!(
            identities = identities.len(),
            path = %self.path.display(),
            "gallery loaded"
        );
        Ok(identities)
    }

    /// Overwrite the persisted gallery with the given identities.
    pub fn save_all(&self, identities: &[Identity]) -> Result<(), StoreError> {
        let records: Vec<IdentityRecord> = identities
            .iter()
            .map(|identity| IdentityRecord {
                name: identity.name.clone(),
                vectors: identity
                    .descriptors
                    .iter()
                    .map(|d| d.values.to_vec())
                    .collect(),
            })
            .collect();

        let text = serde_json::to_string(&records)?;
        std::fs::write(&self.path, text)?;

        tracing::debug!(
            identities = identities.len(),
            path = %self.path.display(),
            "gallery saved"
        );
        Ok(())
    }

    /// Delete the persisted gallery. Idempotent; a missing file is not an
    /// error.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "gallery cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mien_core::DESCRIPTOR_DIM;

    fn temp_store(tag: &str) -> (PathBuf, GalleryStore) {
        let dir = std::env::temp_dir().join(format!(
            "mien-store-test-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let path = dir.join("gallery.json");
        let store = GalleryStore::open(&path).unwrap();
        (dir, store)
    }

    fn descriptor(seed: f32) -> Descriptor {
        let mut values = [0.0f32; DESCRIPTOR_DIM];
        for (i, v) in values.iter_mut().enumerate() {
            *v = seed + i as f32 * 0.01;
        }
        Descriptor { values }
    }

    fn sample_gallery() -> Vec<Identity> {
        vec![
            Identity {
                name: "Alice".to_string(),
                descriptors: vec![descriptor(0.1), descriptor(0.2), descriptor(0.3)],
            },
            Identity {
                name: "Bob".to_string(),
                descriptors: vec![descriptor(0.4), descriptor(0.5)],
            },
        ]
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let (dir, store) = temp_store("first-run");
        assert_eq!(store.load_all().unwrap(), Vec::new());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_roundtrip_preserves_order_and_values() {
        let (dir, store) = temp_store("roundtrip");
        let gallery = sample_gallery();

        store.save_all(&gallery).unwrap();
        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, gallery);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let (dir, store) = temp_store("overwrite");
        store.save_all(&sample_gallery()).unwrap();

        let smaller = vec![Identity {
            name: "Carol".to_string(),
            descriptors: vec![descriptor(0.7)],
        }];
        store.save_all(&smaller).unwrap();

        assert_eq!(store.load_all().unwrap(), smaller);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_wire_format_shape() {
        let (dir, store) = temp_store("wire");
        store.save_all(&sample_gallery()).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "Alice");
        let vectors = records[0]["vectors"].as_array().unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0].as_array().unwrap().len(), 16);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_short_vector_is_rejected_not_padded() {
        let (dir, store) = temp_store("short-vector");
        std::fs::write(
            store.path(),
            r#"[{"name":"Alice","vectors":[[0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,0.9,1.0]]}]"#,
        )
        .unwrap();

        let err = store.load_all().unwrap_err();
        assert!(err.is_corrupt());
        assert!(matches!(
            err,
            StoreError::InvalidVectorLen { len: 10, index: 0, .. }
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let (dir, store) = temp_store("bad-json");
        std::fs::write(store.path(), "not json at all").unwrap();

        let err = store.load_all().unwrap_err();
        assert!(err.is_corrupt());
        assert!(matches!(err, StoreError::Json(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (dir, store) = temp_store("clear");
        store.save_all(&sample_gallery()).unwrap();

        store.clear().unwrap();
        assert_eq!(store.load_all().unwrap(), Vec::new());

        // Clearing an already-empty store succeeds too.
        store.clear().unwrap();

        let _ = std::fs::remove_dir_all(&dir);
    }
}
