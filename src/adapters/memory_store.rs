//! In-memory adapter: Implementation of `ArtifactStore` for tests and local
//! runs without a writable filesystem.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use crate::adapters::StorageError;
use crate::ports::ArtifactStore;

/// In-memory artifact store backed by a mutex-protected map.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts currently held.
    ///
    /// # Panics
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.lock().expect("Lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no artifact {key}"))
}

impl ArtifactStore for MemoryArtifactStore {
    type Error = StorageError;

    fn store(&self, key: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        self.artifacts
            .lock()
            .expect("Lock poisoned")
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, Self::Error> {
        self.artifacts
            .lock()
            .expect("Lock poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::Read {
                key: key.to_string(),
                source: not_found(key),
            })
    }

    fn delete(&self, key: &str) -> Result<(), Self::Error> {
        self.artifacts
            .lock()
            .expect("Lock poisoned")
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::Delete {
                key: key.to_string(),
                source: not_found(key),
            })
    }

    fn exists(&self, key: &str) -> Result<bool, Self::Error> {
        Ok(self
            .artifacts
            .lock()
            .expect("Lock poisoned")
            .contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let store = MemoryArtifactStore::new();
        store.store("k", b"v").expect("Should store");
        assert_eq!(store.read("k").expect("Should read"), b"v");
        assert_eq!(store.len(), 1);

        store.delete("k").expect("Should delete");
        assert!(store.is_empty());
        assert!(store.read("k").is_err());
    }

    #[test]
    fn test_delete_missing_fails() {
        let store = MemoryArtifactStore::new();
        assert!(matches!(
            store.delete("nope"),
            Err(StorageError::Delete { .. })
        ));
    }
}
