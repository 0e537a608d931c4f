//! Bounded worker pool for non-blocking pipeline execution.
//!
//! Gate scoring and disease inference are CPU-bound and blocking, so they
//! must not run on a thread that also accepts new work. The pool owns a fixed
//! number of OS threads consuming jobs from a bounded queue; intake either
//! enqueues immediately or reports back-pressure, it never stalls on
//! inference.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::application::PipelineService;
use crate::domain::PipelineOutcome;
use crate::ports::{ArtifactStore, DiseaseModel, ZeroShotScorer};

/// Progress updates for one submitted upload.
#[derive(Debug)]
pub enum PipelineProgress {
    /// A worker picked the job up and the pipeline is running.
    Accepted,
    /// The pipeline finished with this outcome.
    Complete(PipelineOutcome),
}

/// Error type for job submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Inference queue is full")]
    QueueFull,

    #[error("Inference pool is shut down")]
    Closed,
}

struct Job {
    bytes: Vec<u8>,
    filename: String,
    progress: Sender<PipelineProgress>,
}

/// Fixed-size pool of inference workers over one shared pipeline.
pub struct InferencePool {
    queue: SyncSender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl InferencePool {
    /// Spawn `workers` threads consuming from a queue bounded at
    /// `queue_depth` pending jobs.
    pub fn new<Z, M, S>(
        pipeline: Arc<PipelineService<Z, M, S>>,
        workers: usize,
        queue_depth: usize,
    ) -> Self
    where
        Z: ZeroShotScorer + 'static,
        M: DiseaseModel + 'static,
        S: ArtifactStore + 'static,
    {
        let (queue, jobs) = mpsc::sync_channel::<Job>(queue_depth.max(1));
        let jobs = Arc::new(Mutex::new(jobs));

        let workers = (0..workers.max(1))
            .map(|_| {
                let jobs = Arc::clone(&jobs);
                let pipeline = Arc::clone(&pipeline);
                thread::spawn(move || loop {
                    // Scope the lock to the dequeue so workers run jobs
                    // concurrently.
                    let job = match jobs.lock() {
                        Ok(receiver) => receiver.recv(),
                        Err(_) => break,
                    };
                    let Ok(job) = job else { break };

                    let _ = job.progress.send(PipelineProgress::Accepted);
                    let outcome = pipeline.process(&job.bytes, &job.filename);
                    let _ = job.progress.send(PipelineProgress::Complete(outcome));
                })
            })
            .collect();

        Self { queue, workers }
    }

    /// Submit an upload without blocking.
    ///
    /// # Errors
    /// Returns `QueueFull` when the bound is hit and `Closed` after shutdown.
    pub fn try_submit(
        &self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
    ) -> Result<Receiver<PipelineProgress>, SubmitError> {
        let (tx, rx) = mpsc::channel();
        let job = Job {
            bytes,
            filename: filename.into(),
            progress: tx,
        };

        match self.queue.try_send(job) {
            Ok(()) => Ok(rx),
            Err(TrySendError::Full(_)) => Err(SubmitError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::Closed),
        }
    }

    /// Submit an upload, blocking the caller while the queue is full.
    ///
    /// # Errors
    /// Returns `Closed` after shutdown.
    pub fn submit(
        &self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
    ) -> Result<Receiver<PipelineProgress>, SubmitError> {
        let (tx, rx) = mpsc::channel();
        let job = Job {
            bytes,
            filename: filename.into(),
            progress: tx,
        };

        self.queue.send(job).map_err(|_| SubmitError::Closed)?;
        Ok(rx)
    }

    /// Drain the queue and join all workers.
    pub fn shutdown(self) {
        drop(self.queue);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryArtifactStore;
    use crate::domain::ImageTensor;
    use crate::ports::{ModelError, ScorerError};
    use image::RgbImage;
    use std::io::Cursor;

    struct FixedScorer(Vec<f64>);

    impl ZeroShotScorer for FixedScorer {
        fn score(&self, _image: &RgbImage, _candidates: &[&str]) -> Result<Vec<f64>, ScorerError> {
            Ok(self.0.clone())
        }
    }

    struct FixedModel(Vec<f64>);

    impl DiseaseModel for FixedModel {
        fn input_size(&self) -> u32 {
            8
        }

        fn predict(&self, _input: &ImageTensor) -> Result<Vec<f64>, ModelError> {
            Ok(self.0.clone())
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

    fn test_pool() -> (Arc<MemoryArtifactStore>, InferencePool) {
        let store = Arc::new(MemoryArtifactStore::new());
        let pipeline = Arc::new(PipelineService::new(
            Arc::new(FixedScorer(vec![0.8, 0.1])),
            Arc::new(FixedModel(vec![0.1, 0.2, 0.7])),
            Arc::clone(&store),
        ));
        (store, InferencePool::new(pipeline, 2, 4))
    }

    fn wait_for_outcome(rx: &Receiver<PipelineProgress>) -> PipelineOutcome {
        loop {
            match rx.recv().expect("worker dropped progress channel") {
                PipelineProgress::Accepted => {}
                PipelineProgress::Complete(outcome) => return outcome,
            }
        }
    }

    #[test]
    fn test_submitted_jobs_complete() {
        let (store, pool) = test_pool();

        let first = pool
            .try_submit(png_bytes(), "a.png")
            .expect("Should submit");
        let second = pool
            .try_submit(png_bytes(), "b.png")
            .expect("Should submit");

        for rx in [&first, &second] {
            let outcome = wait_for_outcome(rx);
            assert_eq!(outcome.status_code(), 200);
        }
        assert!(store.is_empty());

        pool.shutdown();
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let (_store, pool) = test_pool();
        let rx = pool
            .try_submit(png_bytes(), "a.png")
            .expect("Should submit");
        pool.shutdown();

        // The queued job still ran to completion before the workers exited.
        let outcome = wait_for_outcome(&rx);
        assert_eq!(outcome.status_code(), 200);
    }
}
