//! Ports layer: Trait definitions for external capabilities.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (artifact storage, the
//! zero-shot gate scorer, the disease model).

mod admission;
mod artifact_store;
mod classifier;

pub use admission::{ScorerError, ZeroShotScorer};
pub use artifact_store::ArtifactStore;
pub use classifier::{DiseaseModel, ModelError};
