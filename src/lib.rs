//! # Fundusgate
//!
//! Admission-and-classification pipeline for retinal fundus photographs.
//!
//! A single uploaded photograph is persisted to transient storage, screened by
//! an admission gate (is this a valid single-retina fundus photo?), and, if
//! admitted, classified into a fixed set of disease categories with a
//! confidence score. The transient artifact is deleted on every exit path,
//! including error paths.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (artifact identity, verdicts, labels, outcomes)
//! - `ports`: Trait definitions for external capabilities (store, scorers)
//! - `adapters`: Concrete implementations (filesystem store, weight-file models)
//! - `application`: Services orchestrating domain and ports

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use domain::{AdmissionVerdict, ClassificationResult, DiseaseLabel, PipelineOutcome};

/// Result type for fundusgate operations.
pub type Result<T> = std::result::Result<T, FundusgateError>;

/// Main error type for fundusgate.
#[derive(Debug, thiserror::Error)]
pub enum FundusgateError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Admission gate failed: {0}")]
    Gate(#[from] application::GateError),

    #[error("Classification failed: {0}")]
    Classification(#[from] application::ClassificationError),

    #[error("Invalid model weights: {0}")]
    InvalidWeights(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
