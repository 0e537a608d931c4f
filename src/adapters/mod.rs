//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integrations:
//! - `fs_store`: filesystem-backed transient upload storage
//! - `memory_store`: in-memory storage for tests and local runs
//! - `prompt_scorer`: distilled prompt-similarity gate scorer
//! - `compact_model`: pooled linear disease classifier

pub mod compact_model;
pub mod fs_store;
pub mod memory_store;
pub mod prompt_scorer;

pub use compact_model::CompactDiseaseModel;
pub use fs_store::FsArtifactStore;
pub use memory_store::MemoryArtifactStore;
pub use prompt_scorer::PromptSimilarityScorer;

// Re-export storage error for lib.rs
pub use fs_store::StorageError;

/// Hex SHA-256 digest of a byte slice, used to fingerprint weight files at
/// load time.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
