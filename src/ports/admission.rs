//! Zero-shot scorer port: Trait for the admission gate's scoring capability.
//!
//! The gate treats the scorer as an opaque capability: given a decoded image
//! and a fixed list of candidate text descriptions, it returns one independent
//! confidence score per description.

use image::RgbImage;

/// Error type for zero-shot scoring operations.
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("Scorer unavailable: {0}")]
    Unavailable(String),

    #[error("Scoring failed: {0}")]
    Scoring(String),
}

/// Trait for zero-shot image-text scoring.
///
/// Implementations must be deterministic: identical image content and
/// candidate list always produce identical scores.
pub trait ZeroShotScorer: Send + Sync {
    /// Score an image against candidate text descriptions.
    ///
    /// # Returns
    /// One score in `[0, 1]` per candidate, in candidate order. Scores are
    /// independent (not a distribution over the candidates).
    ///
    /// # Errors
    /// Returns error if scoring fails; the caller fails closed.
    fn score(&self, image: &RgbImage, candidates: &[&str]) -> Result<Vec<f64>, ScorerError>;
}
