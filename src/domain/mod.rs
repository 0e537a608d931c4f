//! Domain layer: Core business types and logic.
//!
//! This module contains pure types with no dependencies on ports or adapters.
//! Verdict reduction and result construction live here so they can be unit
//! tested without any model or storage backend.

mod artifact;
mod classification;
mod outcome;
mod tensor;
mod verdict;

pub use artifact::UploadArtifact;
pub use classification::{ClassificationResult, DiseaseLabel};
pub use outcome::{PipelineFailure, PipelineOutcome, RejectionReason, ResponseBody};
pub use tensor::ImageTensor;
pub use verdict::{AdmissionVerdict, GateScorePair};
