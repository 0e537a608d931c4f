//! Filesystem adapter: Implementation of `ArtifactStore`.
//!
//! Stores each upload as one file under a dedicated directory. Keys are
//! server-generated single path components; anything containing separators or
//! parent references is refused before touching the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::ports::ArtifactStore;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to create upload directory {path}: {source}")]
    CreateDir { path: String, source: io::Error },

    #[error("Failed to write artifact {key}: {source}")]
    Write { key: String, source: io::Error },

    #[error("Failed to read artifact {key}: {source}")]
    Read { key: String, source: io::Error },

    #[error("Failed to delete artifact {key}: {source}")]
    Delete { key: String, source: io::Error },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Filesystem-backed artifact store.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at the given directory, creating it if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StorageError::CreateDir {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Resolve a key to a path, refusing keys that are not a single safe
    /// path component.
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.starts_with('.')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

impl ArtifactStore for FsArtifactStore {
    type Error = StorageError;

    fn store(&self, key: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        let path = self.resolve(key)?;
        fs::write(&path, bytes).map_err(|source| StorageError::Write {
            key: key.to_string(),
            source,
        })?;
        tracing::debug!(key, bytes = bytes.len(), "Stored upload artifact");
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, Self::Error> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|source| StorageError::Read {
            key: key.to_string(),
            source,
        })
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.resolve(key)?;
        fs::remove_file(&path).map_err(|source| StorageError::Delete {
            key: key.to_string(),
            source,
        })?;
        tracing::debug!(key, "Deleted upload artifact");
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, Self::Error> {
        let path = self.resolve(key)?;
        Ok(path.exists())
    }
}
