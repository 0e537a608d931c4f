//! Disease model port: Trait for the multi-class image scorer.
//!
//! The classifier treats the model as an opaque capability with a fixed input
//! shape and a probability distribution over the fixed label table as output.

use crate::domain::{DiseaseLabel, ImageTensor};

/// Error type for model inference operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Input shape mismatch: expected {expected}x{expected}, got {height}x{width}")]
    ShapeMismatch {
        expected: u32,
        height: u32,
        width: u32,
    },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Trait for closed-set multi-class disease scoring.
///
/// Implementations must be deterministic for a fixed set of weights: no
/// randomness anywhere on the inference path.
pub trait DiseaseModel: Send + Sync {
    /// Side length of the square input the model expects.
    fn input_size(&self) -> u32;

    /// Run inference on a preprocessed tensor.
    ///
    /// # Returns
    /// A probability distribution over `DiseaseLabel::ALL`, in table order,
    /// summing to 1.
    ///
    /// # Errors
    /// Returns error if the tensor shape is wrong or inference fails.
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f64>, ModelError>;

    /// Number of output classes; fixed by the label table.
    fn num_classes(&self) -> usize {
        DiseaseLabel::ALL.len()
    }
}
