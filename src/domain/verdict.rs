//! Admission verdict types.
//!
//! The gate scores an image against two mutually exclusive hypotheses and the
//! pair of scores reduces to a tri-state verdict. Reduction is pure and lives
//! here so the boundary cases can be tested without a scorer.

use serde::{Deserialize, Serialize};

/// Minimum score either hypothesis must clear before the image counts as
/// recognizable fundus content at all. The boundary itself is rejected.
pub const ADMISSION_THRESHOLD: f64 = 0.5;

/// Tri-state admission verdict for one uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionVerdict {
    /// Neither hypothesis is credible; not recognizable as fundus content.
    Rejected,
    /// Exactly one retina present; eligible for classification.
    SingleRetina,
    /// More than one retina in the frame; not eligible.
    MultipleRetinas,
}

impl std::fmt::Display for AdmissionVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected => write!(f, "REJECTED"),
            Self::SingleRetina => write!(f, "SINGLE_RETINA"),
            Self::MultipleRetinas => write!(f, "MULTIPLE_RETINAS"),
        }
    }
}

/// Independent confidence scores for the two admission hypotheses.
///
/// Ephemeral: exists only between scoring and reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateScorePair {
    /// Confidence that exactly one retina is present.
    pub single: f64,
    /// Confidence that two retinas appear side by side.
    pub multiple: f64,
}

impl GateScorePair {
    /// Create a score pair, clamping both scores into `[0, 1]`.
    #[must_use]
    pub fn new(single: f64, multiple: f64) -> Self {
        Self {
            single: single.clamp(0.0, 1.0),
            multiple: multiple.clamp(0.0, 1.0),
        }
    }

    /// Reduce the score pair to a verdict.
    ///
    /// The multiple-retina branch requires strict dominance, so a tie
    /// resolves to `SingleRetina`.
    #[must_use]
    pub fn verdict(&self) -> AdmissionVerdict {
        let best = self.single.max(self.multiple);
        if best <= ADMISSION_THRESHOLD {
            AdmissionVerdict::Rejected
        } else if self.multiple > self.single {
            AdmissionVerdict::MultipleRetinas
        } else {
            AdmissionVerdict::SingleRetina
        }
    }
}
