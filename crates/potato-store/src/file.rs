use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use potato_types::Potato;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::ChainStore;

/// Chain store backed by a single pretty-printed JSON document.
///
/// On-disk format: one JSON array of potato records with camelCase field
/// names (`id`, `creator`, `currentHolder`, `createdAt`, `chain`).
///
/// Writes go to a temporary file in the target directory, are flushed to
/// disk with `sync_all`, and are then renamed over the target. Rename within
/// a directory is atomic, so readers see either the previous document or
/// the new one.
#[derive(Debug, Clone)]
pub struct JsonFileChainStore {
    path: PathBuf,
}

impl JsonFileChainStore {
    /// Create a store for the document at `path`. Nothing is touched on disk
    /// until the first `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl ChainStore for JsonFileChainStore {
    fn load(&self) -> StoreResult<Vec<Potato>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "chain store file absent; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        let potatoes: Vec<Potato> = serde_json::from_str(&data).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "chain store document is corrupt");
            StoreError::Corrupt {
                location: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        debug!(path = %self.path.display(), count = potatoes.len(), "chain store loaded");
        Ok(potatoes)
    }

    fn save(&self, potatoes: &[Potato]) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(potatoes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            count = potatoes.len(),
            bytes = bytes.len(),
            "chain store saved"
        );
        Ok(())
    }
}
