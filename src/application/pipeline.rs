//! Pipeline orchestrator: sequences the admission gate and the disease
//! classifier over one stored upload.
//!
//! The state machine is linear with no retries: persist, gate, classify.
//! Whatever branch terminates the request, the stored artifact is deleted
//! exactly once before the outcome is returned. Deletion is owned by a
//! Drop-based guard armed right after the write succeeds, so it also fires
//! when a stage panics; the panic itself is converted to a `Failed(Unknown)`
//! outcome instead of crossing the request boundary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::application::{AdmissionService, ClassificationService};
use crate::domain::{
    AdmissionVerdict, PipelineFailure, PipelineOutcome, RejectionReason, UploadArtifact,
};
use crate::ports::{ArtifactStore, DiseaseModel, ZeroShotScorer};

/// Orchestrator for the admission-and-classification pipeline.
///
/// Scorer and model are process-wide immutable resources shared by reference;
/// each `process` call is independent and owns only its artifact.
pub struct PipelineService<Z, M, S>
where
    Z: ZeroShotScorer,
    M: DiseaseModel,
    S: ArtifactStore,
{
    gate: AdmissionService<Z>,
    classifier: ClassificationService<M>,
    store: Arc<S>,
}

impl<Z, M, S> PipelineService<Z, M, S>
where
    Z: ZeroShotScorer,
    M: DiseaseModel,
    S: ArtifactStore,
{
    /// Create a new pipeline over shared scorer, model, and store.
    pub fn new(scorer: Arc<Z>, model: Arc<M>, store: Arc<S>) -> Self {
        Self {
            gate: AdmissionService::new(scorer),
            classifier: ClassificationService::new(model),
            store,
        }
    }

    /// Run one upload through the pipeline.
    ///
    /// Always returns exactly one outcome; by the time it does, the stored
    /// artifact has been deleted on every path except a failed initial write
    /// (where nothing was persisted).
    pub fn process(&self, upload: &[u8], filename: &str) -> PipelineOutcome {
        let artifact = UploadArtifact::for_upload(filename);
        tracing::info!(
            filename,
            key = artifact.key(),
            bytes = upload.len(),
            "Processing upload"
        );

        if let Err(e) = self.store.store(artifact.key(), upload) {
            tracing::error!(key = artifact.key(), error = %e, "Failed to persist upload");
            return PipelineOutcome::Failed {
                filename: filename.to_string(),
                failure: PipelineFailure::Storage {
                    detail: e.to_string(),
                },
            };
        }

        // From here on the artifact exists; the guard deletes it on every
        // exit, including unwinding.
        let _guard = ArtifactGuard {
            store: self.store.as_ref(),
            key: artifact.key(),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(&artifact))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                tracing::error!(key = artifact.key(), detail, "Pipeline stage panicked");
                PipelineOutcome::Failed {
                    filename: filename.to_string(),
                    failure: PipelineFailure::Unknown {
                        detail: detail.to_string(),
                    },
                }
            }
        }
    }

    /// Gate and classify one persisted artifact.
    fn run_stages(&self, artifact: &UploadArtifact) -> PipelineOutcome {
        let filename = artifact.display_name().to_string();

        // Score exactly what was persisted, not the transport buffer.
        let bytes = match self.store.read(artifact.key()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(key = artifact.key(), error = %e, "Failed to read stored artifact");
                return PipelineOutcome::Failed {
                    filename,
                    failure: PipelineFailure::Storage {
                        detail: e.to_string(),
                    },
                };
            }
        };

        let verdict = match self.gate.evaluate(&bytes) {
            Ok(verdict) => verdict,
            Err(e) => {
                // Fail closed: an unevaluable image is never admitted.
                tracing::warn!(key = artifact.key(), error = %e, "Gate failed, rejecting");
                return PipelineOutcome::Rejected {
                    filename,
                    reason: RejectionReason::NotFundus,
                };
            }
        };

        match verdict {
            AdmissionVerdict::Rejected => PipelineOutcome::Rejected {
                filename,
                reason: RejectionReason::NotFundus,
            },
            AdmissionVerdict::MultipleRetinas => PipelineOutcome::Rejected {
                filename,
                reason: RejectionReason::MultipleRetinas,
            },
            AdmissionVerdict::SingleRetina => match self.classifier.classify(&bytes) {
                Ok(result) => PipelineOutcome::Classified { filename, result },
                Err(e) => PipelineOutcome::Failed {
                    filename,
                    failure: PipelineFailure::Classification {
                        detail: e.to_string(),
                    },
                },
            },
        }
    }
}

/// Scoped deletion of one stored artifact.
///
/// Deletion is best-effort: a failure is logged and swallowed so it can never
/// mask the pipeline outcome or crash the request.
struct ArtifactGuard<'a, S: ArtifactStore> {
    store: &'a S,
    key: &'a str,
}

impl<S: ArtifactStore> Drop for ArtifactGuard<'_, S> {
    fn drop(&mut self) {
        match self.store.delete(self.key) {
            Ok(()) => tracing::debug!(key = self.key, "Artifact cleaned up"),
            Err(e) => tracing::warn!(key = self.key, error = %e, "Artifact cleanup failed"),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unidentified panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryArtifactStore, StorageError};
    use crate::domain::{DiseaseLabel, ImageTensor};
    use crate::ports::{ModelError, ScorerError};
    use image::RgbImage;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedScorer(Vec<f64>);

    impl ZeroShotScorer for FixedScorer {
        fn score(&self, _image: &RgbImage, _candidates: &[&str]) -> Result<Vec<f64>, ScorerError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenScorer;

    impl ZeroShotScorer for BrokenScorer {
        fn score(&self, _image: &RgbImage, _candidates: &[&str]) -> Result<Vec<f64>, ScorerError> {
            Err(ScorerError::Unavailable("scorer offline".into()))
        }
    }

    /// Counts invocations so tests can assert the classifier never runs on
    /// non-admitted images.
    struct CountingModel {
        distribution: Vec<f64>,
        calls: AtomicUsize,
    }

    impl CountingModel {
        fn new(distribution: Vec<f64>) -> Self {
            Self {
                distribution,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl DiseaseModel for CountingModel {
        fn input_size(&self) -> u32 {
            8
        }

        fn predict(&self, _input: &ImageTensor) -> Result<Vec<f64>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.distribution.clone())
        }
    }

    struct BrokenModel;

    impl DiseaseModel for BrokenModel {
        fn input_size(&self) -> u32 {
            8
        }

        fn predict(&self, _input: &ImageTensor) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::Inference("weights corrupted".into()))
        }
    }

    struct PanickingModel;

    impl DiseaseModel for PanickingModel {
        fn input_size(&self) -> u32 {
            8
        }

        fn predict(&self, _input: &ImageTensor) -> Result<Vec<f64>, ModelError> {
            panic!("synthetic inference panic");
        }
    }

    /// Store whose writes always fail, for the storage-failure path.
    struct UnwritableStore;

    impl ArtifactStore for UnwritableStore {
        type Error = StorageError;

        fn store(&self, key: &str, _bytes: &[u8]) -> Result<(), Self::Error> {
            Err(StorageError::Write {
                key: key.to_string(),
                source: std::io::Error::other("disk full"),
            })
        }

        fn read(&self, _key: &str) -> Result<Vec<u8>, Self::Error> {
            unreachable!("nothing is ever stored");
        }

        fn delete(&self, _key: &str) -> Result<(), Self::Error> {
            unreachable!("nothing is ever stored");
        }

        fn exists(&self, _key: &str) -> Result<bool, Self::Error> {
            Ok(false)
        }
    }

    fn png_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("Should encode");
        bytes
    }

    fn pipeline_with(
        scores: Vec<f64>,
        model: CountingModel,
    ) -> (
        Arc<CountingModel>,
        Arc<MemoryArtifactStore>,
        PipelineService<FixedScorer, CountingModel, MemoryArtifactStore>,
    ) {
        let model = Arc::new(model);
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = PipelineService::new(
            Arc::new(FixedScorer(scores)),
            Arc::clone(&model),
            Arc::clone(&store),
        );
        (model, store, pipeline)
    }

    #[test]
    fn test_admitted_image_is_classified_and_cleaned_up() {
        // Scenario A: s=0.8, m=0.1 -> SingleRetina -> classifier runs.
        let (model, store, pipeline) =
            pipeline_with(vec![0.8, 0.1], CountingModel::new(vec![0.9234, 0.05, 0.0266]));

        let outcome = pipeline.process(&png_bytes(), "retina.png");
        match outcome {
            PipelineOutcome::Classified { filename, result } => {
                assert_eq!(filename, "retina.png");
                assert_eq!(result.label, DiseaseLabel::Dr);
                assert!((result.confidence - 92.34).abs() < f64::EPSILON);
            }
            other => panic!("expected Classified, got {other:?}"),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
        assert!(store.is_empty(), "artifact must be deleted");
    }

    #[test]
    fn test_multiple_retinas_rejected_without_classifying() {
        // Scenario B: s=0.2, m=0.75 -> MultipleRetinas.
        let (model, store, pipeline) =
            pipeline_with(vec![0.2, 0.75], CountingModel::new(vec![0.3, 0.3, 0.4]));

        let outcome = pipeline.process(&png_bytes(), "pair.png");
        assert_eq!(
            outcome,
            PipelineOutcome::Rejected {
                filename: "pair.png".into(),
                reason: RejectionReason::MultipleRetinas,
            }
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_unrecognizable_image_rejected() {
        // Scenario C: s=0.3, m=0.4 -> best 0.4 <= 0.5 -> Rejected.
        let (model, store, pipeline) =
            pipeline_with(vec![0.3, 0.4], CountingModel::new(vec![0.3, 0.3, 0.4]));

        let outcome = pipeline.process(&png_bytes(), "cat.png");
        assert_eq!(
            outcome,
            PipelineOutcome::Rejected {
                filename: "cat.png".into(),
                reason: RejectionReason::NotFundus,
            }
        );
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_storage_failure_is_terminal() {
        // Scenario D: the write fails, nothing to clean, no stage runs.
        let pipeline = PipelineService::new(
            Arc::new(FixedScorer(vec![0.8, 0.1])),
            Arc::new(CountingModel::new(vec![0.3, 0.3, 0.4])),
            Arc::new(UnwritableStore),
        );

        let outcome = pipeline.process(&png_bytes(), "retina.png");
        assert!(matches!(
            outcome,
            PipelineOutcome::Failed {
                failure: PipelineFailure::Storage { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_classifier_failure_still_cleans_up() {
        // Scenario E: inference fails after admission; artifact still deleted.
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = PipelineService::new(
            Arc::new(FixedScorer(vec![0.8, 0.1])),
            Arc::new(BrokenModel),
            Arc::clone(&store),
        );

        let outcome = pipeline.process(&png_bytes(), "retina.png");
        assert!(matches!(
            outcome,
            PipelineOutcome::Failed {
                failure: PipelineFailure::Classification { .. },
                ..
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_gate_error_fails_closed_and_cleans_up() {
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = PipelineService::new(
            Arc::new(BrokenScorer),
            Arc::new(CountingModel::new(vec![0.3, 0.3, 0.4])),
            Arc::clone(&store),
        );

        let outcome = pipeline.process(&png_bytes(), "retina.png");
        assert_eq!(
            outcome,
            PipelineOutcome::Rejected {
                filename: "retina.png".into(),
                reason: RejectionReason::NotFundus,
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_undecodable_upload_is_rejected_and_cleaned_up() {
        let (model, store, pipeline) =
            pipeline_with(vec![0.8, 0.1], CountingModel::new(vec![0.3, 0.3, 0.4]));

        let outcome = pipeline.process(b"definitely not an image", "note.txt");
        assert!(matches!(outcome, PipelineOutcome::Rejected { .. }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_stage_panic_becomes_unknown_failure_with_cleanup() {
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = PipelineService::new(
            Arc::new(FixedScorer(vec![0.8, 0.1])),
            Arc::new(PanickingModel),
            Arc::clone(&store),
        );

        let outcome = pipeline.process(&png_bytes(), "retina.png");
        match outcome {
            PipelineOutcome::Failed {
                failure: PipelineFailure::Unknown { detail },
                ..
            } => assert!(detail.contains("synthetic inference panic")),
            other => panic!("expected Failed(Unknown), got {other:?}"),
        }
        assert!(store.is_empty(), "artifact must be deleted even on panic");
    }

    #[test]
    fn test_identical_uploads_yield_identical_results() {
        let (_, _, pipeline) =
            pipeline_with(vec![0.8, 0.1], CountingModel::new(vec![0.1, 0.7, 0.2]));

        let bytes = png_bytes();
        let first = pipeline.process(&bytes, "same.png");
        let second = pipeline.process(&bytes, "same.png");
        assert_eq!(first, second);
    }

    #[test]
    fn test_concurrent_identical_filenames_do_not_collide() {
        // Two in-flight artifacts with the same display name must occupy two
        // distinct storage keys.
        let store = Arc::new(MemoryArtifactStore::new());
        let a = UploadArtifact::for_upload("same.png");
        let b = UploadArtifact::for_upload("same.png");
        store.store(a.key(), b"a").expect("Should store");
        store.store(b.key(), b"b").expect("Should store");
        assert_eq!(store.len(), 2);
    }
}
