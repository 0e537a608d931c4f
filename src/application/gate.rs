//! Admission gate service: decides whether an upload is a valid single-retina
//! fundus photo before the expensive classification stage runs.
//!
//! Scoring is pure: the gate has no side effects on storage. Any internal
//! error is surfaced as a `GateError` and the orchestrator fails closed,
//! treating it as a rejection rather than letting an unscreened image through.

use std::sync::Arc;

use crate::domain::{AdmissionVerdict, GateScorePair};
use crate::ports::{ScorerError, ZeroShotScorer};

/// Candidate description for the single-retina hypothesis.
pub const SINGLE_RETINA_PROMPT: &str = "image showing only one human retina from a fundus camera";

/// Candidate description for the multiple-retina hypothesis.
pub const MULTIPLE_RETINA_PROMPT: &str =
    "image showing two human retinas captured side by side in a single image";

/// Error type for gate evaluation.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Zero-shot scorer failed: {0}")]
    Scorer(#[from] ScorerError),
}

/// Service evaluating uploads against the two admission hypotheses.
pub struct AdmissionService<Z: ZeroShotScorer> {
    scorer: Arc<Z>,
}

impl<Z: ZeroShotScorer> AdmissionService<Z> {
    /// Create a new admission service over a shared scorer.
    pub fn new(scorer: Arc<Z>) -> Self {
        Self { scorer }
    }

    /// Evaluate an uploaded image and reduce the hypothesis scores to a
    /// verdict.
    ///
    /// # Errors
    /// Returns `GateError::Decode` if the bytes are not a decodable image and
    /// `GateError::Scorer` if the scorer fails.
    pub fn evaluate(&self, bytes: &[u8]) -> Result<AdmissionVerdict, GateError> {
        let image = image::load_from_memory(bytes)?.to_rgb8();

        let candidates = [SINGLE_RETINA_PROMPT, MULTIPLE_RETINA_PROMPT];
        let scores = self.scorer.score(&image, &candidates)?;
        if scores.len() != candidates.len() {
            return Err(GateError::Scorer(ScorerError::Scoring(format!(
                "expected {} scores, got {}",
                candidates.len(),
                scores.len()
            ))));
        }

        let pair = GateScorePair::new(scores[0], scores[1]);
        let verdict = pair.verdict();
        tracing::info!(
            single = pair.single,
            multiple = pair.multiple,
            %verdict,
            "Admission gate evaluated"
        );

        Ok(verdict)
    }
}
