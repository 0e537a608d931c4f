//! Artifact store port: Trait for transient upload storage.
//!
//! This trait abstracts the storage backend (filesystem, in-memory) from the
//! pipeline logic. Artifacts are strictly per-request: written once, read back
//! for scoring, and deleted before the request completes.

/// Trait for transient artifact storage operations.
pub trait ArtifactStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist an uploaded byte stream under the given storage key.
    ///
    /// # Errors
    /// Returns error if the bytes cannot be written.
    fn store(&self, key: &str, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Read a stored artifact back.
    ///
    /// # Errors
    /// Returns error if the artifact is missing or unreadable.
    fn read(&self, key: &str) -> Result<Vec<u8>, Self::Error>;

    /// Delete a stored artifact.
    ///
    /// # Errors
    /// Returns error if deletion fails; callers on the cleanup path treat
    /// this as best-effort.
    fn delete(&self, key: &str) -> Result<(), Self::Error>;

    /// Check whether an artifact exists under the given key.
    ///
    /// # Errors
    /// Returns error if existence cannot be determined.
    fn exists(&self, key: &str) -> Result<bool, Self::Error>;
}
