//! Compact classifier adapter: Implementation of `DiseaseModel`.
//!
//! Consumes a JSON export distilled offline from the reference convolutional
//! checkpoint: the normalized input tensor is average-pooled onto a small
//! grid, flattened, and pushed through a linear head with a softmax over the
//! fixed label table. The export carries its own label table, which must match
//! the built-in one exactly or loading fails.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{DiseaseLabel, ImageTensor};
use crate::ports::{DiseaseModel, ModelError};
use crate::FundusgateError;

/// Classifier weights exported by the offline distillation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierWeights {
    pub format_version: u32,
    /// Side length of the square input the head was trained against.
    pub input_size: u32,
    /// Side length of the average-pooling grid.
    pub pool_grid: u32,
    /// Label table in output order; must match `DiseaseLabel::ALL`.
    pub labels: Vec<String>,
    /// One weight row per label, `pool_grid^2 * 3` columns each.
    pub weights: Vec<Vec<f64>>,
    /// One bias per label.
    pub bias: Vec<f64>,
}

/// Disease model backed by distilled pooled-linear weights.
pub struct CompactDiseaseModel {
    weights: ClassifierWeights,
}

impl CompactDiseaseModel {
    /// Load classifier weights from a JSON export.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let weights: ClassifierWeights = serde_json::from_slice(&bytes)?;

        let model = Self::from_weights(weights)?;
        tracing::info!(
            path = %path.display(),
            fingerprint = %super::sha256_hex(&bytes),
            input_size = model.weights.input_size,
            "Loaded classifier weights"
        );
        Ok(model)
    }

    /// Build a model from in-memory weights, validating their shape and
    /// label table.
    ///
    /// # Errors
    /// Returns `InvalidWeights` if any dimension or label is inconsistent.
    pub fn from_weights(weights: ClassifierWeights) -> crate::Result<Self> {
        if weights.input_size == 0 || weights.pool_grid == 0 {
            return Err(FundusgateError::InvalidWeights(
                "input_size and pool_grid must be non-zero".into(),
            ));
        }

        let expected: Vec<&str> = DiseaseLabel::ALL.iter().map(DiseaseLabel::as_str).collect();
        if weights.labels != expected {
            return Err(FundusgateError::InvalidWeights(format!(
                "label table {:?} does not match expected {:?}",
                weights.labels, expected
            )));
        }

        let feature_len = (weights.pool_grid * weights.pool_grid * 3) as usize;
        if weights.weights.len() != expected.len() || weights.bias.len() != expected.len() {
            return Err(FundusgateError::InvalidWeights(format!(
                "expected {} weight rows and biases, got {} and {}",
                expected.len(),
                weights.weights.len(),
                weights.bias.len()
            )));
        }
        for row in &weights.weights {
            if row.len() != feature_len {
                return Err(FundusgateError::InvalidWeights(format!(
                    "expected {feature_len} weight columns, got {}",
                    row.len()
                )));
            }
        }

        Ok(Self { weights })
    }

    /// Average-pool the tensor onto the configured grid, channel-interleaved
    /// per cell.
    fn pool(&self, input: &ImageTensor) -> Vec<f64> {
        let grid = self.weights.pool_grid;
        let size = input.width();
        let mut features = Vec::with_capacity((grid * grid * 3) as usize);

        for cy in 0..grid {
            for cx in 0..grid {
                let x0 = cx * size / grid;
                let x1 = (cx + 1) * size / grid;
                let y0 = cy * size / grid;
                let y1 = (cy + 1) * size / grid;

                for channel in 0..ImageTensor::CHANNELS {
                    let mut sum = 0.0f64;
                    let mut count = 0u64;
                    for y in y0..y1 {
                        for x in x0..x1 {
                            sum += f64::from(input.get(y, x, channel));
                            count += 1;
                        }
                    }
                    features.push(if count > 0 { sum / count as f64 } else { 0.0 });
                }
            }
        }

        features
    }
}

impl DiseaseModel for CompactDiseaseModel {
    fn input_size(&self) -> u32 {
        self.weights.input_size
    }

    fn predict(&self, input: &ImageTensor) -> Result<Vec<f64>, ModelError> {
        let expected = self.weights.input_size;
        if input.height() != expected || input.width() != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                height: input.height(),
                width: input.width(),
            });
        }

        let features = self.pool(input);
        let logits: Vec<f64> = self
            .weights
            .weights
            .iter()
            .zip(&self.weights.bias)
            .map(|(row, bias)| row.iter().zip(&features).map(|(w, f)| w * f).sum::<f64>() + bias)
            .collect();

        Ok(softmax(&logits))
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}
