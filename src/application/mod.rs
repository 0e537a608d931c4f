//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement the
//! admission-and-classification pipeline.

mod classifier;
mod gate;
mod pipeline;
mod worker;

pub use classifier::{ClassificationError, ClassificationService};
pub use gate::{AdmissionService, GateError, MULTIPLE_RETINA_PROMPT, SINGLE_RETINA_PROMPT};
pub use pipeline::PipelineService;
pub use worker::{InferencePool, PipelineProgress, SubmitError};
