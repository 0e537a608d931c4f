//! Pipeline outcome and transport response shapes.
//!
//! Exactly one `PipelineOutcome` is produced per request, and the stored
//! artifact is guaranteed deleted by the time any variant is returned. The
//! transport layer (out of scope here) maps outcomes to HTTP responses; the
//! status codes and body shapes it needs are defined alongside the outcome so
//! the contract lives in one place.

use serde::Serialize;

use super::ClassificationResult;

/// Client-correctable reasons for refusing an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectionReason {
    /// Neither admission hypothesis was credible, or the gate failed closed.
    NotFundus,
    /// The image was recognized but contains more than one retina.
    MultipleRetinas,
}

impl RejectionReason {
    /// User-facing rejection message.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFundus => "Not a valid fundus image.",
            Self::MultipleRetinas => "Only allowed image with single retina",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Server-side failure taxonomy carried by `PipelineOutcome::Failed`.
///
/// Details are short diagnostic messages; internal traces never cross this
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum PipelineFailure {
    /// The upload could not be persisted, or the stored copy could not be
    /// read back.
    #[error("storage failure: {detail}")]
    Storage { detail: String },

    /// Preprocessing or inference failed after admission.
    #[error("classification failure: {detail}")]
    Classification { detail: String },

    /// Catch-all for unexpected internal errors at any stage.
    #[error("unexpected failure: {detail}")]
    Unknown { detail: String },
}

/// Discriminated terminal result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The upload was refused for a client-correctable reason.
    Rejected {
        filename: String,
        reason: RejectionReason,
    },
    /// The upload was admitted and classified.
    Classified {
        filename: String,
        result: ClassificationResult,
    },
    /// A server-side failure ended the request.
    Failed {
        filename: String,
        failure: PipelineFailure,
    },
}

impl PipelineOutcome {
    /// HTTP-equivalent status code for this outcome.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Classified { .. } => 200,
            Self::Rejected { .. } => 400,
            Self::Failed { .. } => 500,
        }
    }

    /// Transport-shaped response body for this outcome.
    #[must_use]
    pub fn to_body(&self) -> ResponseBody {
        match self {
            Self::Classified { filename, result } => ResponseBody::Classified {
                filename: filename.clone(),
                status: "Image successfully uploaded",
                predicted_class: result.label.as_str(),
                confidence: result.confidence,
            },
            Self::Rejected { filename, reason } => ResponseBody::Rejected {
                filename: filename.clone(),
                message: reason.message(),
            },
            Self::Failed { failure, .. } => ResponseBody::Failed {
                message: "Image upload failed",
                details: failure.to_string(),
            },
        }
    }
}

/// JSON body returned to the transport layer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Classified {
        filename: String,
        status: &'static str,
        predicted_class: &'static str,
        confidence: f64,
    },
    Rejected {
        filename: String,
        message: &'static str,
    },
    Failed {
        message: &'static str,
        details: String,
    },
}
