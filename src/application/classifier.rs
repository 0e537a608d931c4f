//! Disease classification service: preprocesses an admitted image and runs
//! the multi-class scorer.
//!
//! Preprocessing is pinned to the training-time exporter: fixed square
//! resolution from the model, nearest-neighbor resize, RGB channel order,
//! intensities scaled by `1 / 255`, leading batch dimension of 1. A deviation
//! here does not raise an error, it silently degrades accuracy, so none of
//! these choices may change without re-exporting the weights.

use std::sync::Arc;

use image::imageops::FilterType;

use crate::domain::{ClassificationResult, ImageTensor};
use crate::ports::{DiseaseModel, ModelError};

/// Resize filter used when the model weights were exported.
const RESIZE_FILTER: FilterType = FilterType::Nearest;

/// Error type for classification.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Model inference failed: {0}")]
    Model(#[from] ModelError),

    #[error("Model returned an unusable distribution: {0}")]
    InvalidDistribution(String),
}

/// Service classifying admitted fundus images into disease categories.
pub struct ClassificationService<M: DiseaseModel> {
    model: Arc<M>,
}

impl<M: DiseaseModel> ClassificationService<M> {
    /// Create a new classification service over a shared model.
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    /// Classify an admitted image.
    ///
    /// Never returns a partial result: any preprocessing or inference failure
    /// is reported as a `ClassificationError`.
    ///
    /// # Errors
    /// Returns error if decoding, preprocessing, or inference fails.
    pub fn classify(&self, bytes: &[u8]) -> Result<ClassificationResult, ClassificationError> {
        let size = self.model.input_size();
        let resized = image::load_from_memory(bytes)?
            .resize_exact(size, size, RESIZE_FILTER)
            .to_rgb8();
        let tensor = ImageTensor::from_rgb(&resized);

        let distribution = self.model.predict(&tensor)?;
        let result = ClassificationResult::from_distribution(&distribution).ok_or_else(|| {
            ClassificationError::InvalidDistribution(format!(
                "{} values for {} labels",
                distribution.len(),
                self.model.num_classes()
            ))
        })?;

        tracing::info!(
            label = %result.label,
            confidence = result.confidence,
            "Classification complete"
        );

        Ok(result)
    }
}
