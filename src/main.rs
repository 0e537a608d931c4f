//! Fundusgate: retinal fundus image admission and classification pipeline.
//!
//! Local runner entry point: loads the scorer and model weights once, then
//! feeds the image files named on the command line through the pipeline and
//! prints the transport-shaped JSON outcome for each.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fundusgate::adapters::{CompactDiseaseModel, FsArtifactStore, PromptSimilarityScorer};
use fundusgate::application::{InferencePool, PipelineProgress, PipelineService};

fn main() -> Result<()> {
    let _guard = init_logging()?;
    tracing::info!("Starting fundusgate...");

    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        bail!("usage: fundusgate <image>...");
    }

    // Models are loaded once and shared read-only for the process lifetime.
    // A load failure is fatal here, before any upload is accepted.
    let model_dir = PathBuf::from(env_or("FUNDUSGATE_MODEL_DIR", "models"));
    let scorer = Arc::new(
        PromptSimilarityScorer::load(model_dir.join("gate_weights.json"))
            .context("Failed to load gate weights")?,
    );
    let model = Arc::new(
        CompactDiseaseModel::load(model_dir.join("classifier_weights.json"))
            .context("Failed to load classifier weights")?,
    );
    let store = Arc::new(
        FsArtifactStore::new(env_or("FUNDUSGATE_UPLOAD_DIR", "uploads"))
            .context("Failed to prepare upload directory")?,
    );

    let pipeline = Arc::new(PipelineService::new(scorer, model, store));
    let workers = std::env::var("FUNDUSGATE_WORKERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(num_cpus::get);
    let pool = InferencePool::new(pipeline, workers, workers * 2);

    let mut failures = 0usize;
    let pending: Vec<_> = paths
        .into_iter()
        .map(|path| -> Result<_> {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let rx = pool
                .submit(bytes, filename.clone())
                .context("Failed to queue upload")?;
            Ok((filename, rx))
        })
        .collect::<Result<_>>()?;

    for (filename, rx) in pending {
        loop {
            match rx.recv() {
                Ok(PipelineProgress::Accepted) => {}
                Ok(PipelineProgress::Complete(outcome)) => {
                    if outcome.status_code() != 200 {
                        failures += 1;
                    }
                    let body = serde_json::to_string_pretty(&outcome.to_body())?;
                    println!("{filename}: {} {body}", outcome.status_code());
                    break;
                }
                Err(_) => bail!("worker pool dropped the job for {filename}"),
            }
        }
    }

    pool.shutdown();
    tracing::info!("Fundusgate shutdown complete.");

    if failures > 0 {
        bail!("{failures} upload(s) did not classify successfully");
    }
    Ok(())
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Initialize logging.
///
/// Default behavior:
/// - `FUNDUSGATE_LOG_MODE=file`: append to `FUNDUSGATE_LOG_FILE`
/// - `FUNDUSGATE_LOG_MODE=stdout` (or unset): log to stdout
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_mode = env_or("FUNDUSGATE_LOG_MODE", "stdout");

    let (writer, guard) = if log_mode == "file" {
        let log_file = env_or("FUNDUSGATE_LOG_FILE", "fundusgate.log");
        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    // The caller must hold the guard for the process lifetime.
    Ok(guard)
}
