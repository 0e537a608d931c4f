//! Prompt-similarity adapter: Implementation of `ZeroShotScorer`.
//!
//! Consumes a compact JSON export distilled offline from the reference
//! image-text checkpoint: a linear projection from pooled patch intensities
//! into the embedding space, plus precomputed text embeddings for the
//! candidate prompts. A candidate's score is the sigmoid of the scaled cosine
//! similarity between the image embedding and that prompt's embedding, so
//! scores are independent per candidate rather than a distribution.

use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::ports::{ScorerError, ZeroShotScorer};
use crate::FundusgateError;

/// Gate weights exported by the offline distillation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateWeights {
    pub format_version: u32,
    /// Side length of the pooling grid over the image.
    pub patch_grid: u32,
    /// Dimensionality of the shared embedding space.
    pub embed_dim: usize,
    /// Scale applied to cosine similarity before the sigmoid.
    pub logit_scale: f64,
    /// Bias applied to cosine similarity before the sigmoid.
    pub logit_bias: f64,
    /// Row-major projection: `embed_dim` rows of `patch_grid^2 * 3` columns.
    pub projection: Vec<Vec<f64>>,
    /// Precomputed text embeddings, keyed by exact prompt text.
    pub prompts: Vec<PromptEmbedding>,
}

/// One candidate prompt with its precomputed text embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptEmbedding {
    pub text: String,
    pub embedding: Vec<f64>,
}

/// Zero-shot scorer backed by distilled prompt-similarity weights.
pub struct PromptSimilarityScorer {
    weights: GateWeights,
}

impl PromptSimilarityScorer {
    /// Load gate weights from a JSON export.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let weights: GateWeights = serde_json::from_slice(&bytes)?;

        let scorer = Self::from_weights(weights)?;
        tracing::info!(
            path = %path.display(),
            fingerprint = %super::sha256_hex(&bytes),
            prompts = scorer.weights.prompts.len(),
            "Loaded gate weights"
        );
        Ok(scorer)
    }

    /// Build a scorer from in-memory weights, validating their shape.
    ///
    /// # Errors
    /// Returns `InvalidWeights` if any dimension is inconsistent.
    pub fn from_weights(weights: GateWeights) -> crate::Result<Self> {
        if weights.patch_grid == 0 || weights.embed_dim == 0 {
            return Err(FundusgateError::InvalidWeights(
                "patch_grid and embed_dim must be non-zero".into(),
            ));
        }
        let feature_len = (weights.patch_grid * weights.patch_grid * 3) as usize;
        if weights.projection.len() != weights.embed_dim {
            return Err(FundusgateError::InvalidWeights(format!(
                "expected {} projection rows, got {}",
                weights.embed_dim,
                weights.projection.len()
            )));
        }
        for row in &weights.projection {
            if row.len() != feature_len {
                return Err(FundusgateError::InvalidWeights(format!(
                    "expected {feature_len} projection columns, got {}",
                    row.len()
                )));
            }
        }
        for prompt in &weights.prompts {
            if prompt.embedding.len() != weights.embed_dim {
                return Err(FundusgateError::InvalidWeights(format!(
                    "prompt {:?} embedding has {} dims, expected {}",
                    prompt.text,
                    prompt.embedding.len(),
                    weights.embed_dim
                )));
            }
        }

        Ok(Self { weights })
    }

    /// Mean RGB intensity per pooling cell, flattened cell-major then channel.
    fn patch_features(&self, image: &RgbImage) -> Vec<f64> {
        let grid = self.weights.patch_grid;
        let (width, height) = image.dimensions();
        let mut features = Vec::with_capacity((grid * grid * 3) as usize);

        for cy in 0..grid {
            for cx in 0..grid {
                let x0 = cx * width / grid;
                let x1 = (cx + 1) * width / grid;
                let y0 = cy * height / grid;
                let y1 = (cy + 1) * height / grid;

                let mut sums = [0.0f64; 3];
                let mut count = 0u64;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let pixel = image.get_pixel(x, y);
                        for (sum, &value) in sums.iter_mut().zip(pixel.0.iter()) {
                            *sum += f64::from(value) / 255.0;
                        }
                        count += 1;
                    }
                }
                for sum in sums {
                    features.push(if count > 0 { sum / count as f64 } else { 0.0 });
                }
            }
        }

        features
    }

    fn embed(&self, features: &[f64]) -> Vec<f64> {
        let mut embedding: Vec<f64> = self
            .weights
            .projection
            .iter()
            .map(|row| row.iter().zip(features).map(|(w, f)| w * f).sum())
            .collect();
        normalize(&mut embedding);
        embedding
    }
}

impl ZeroShotScorer for PromptSimilarityScorer {
    fn score(&self, image: &RgbImage, candidates: &[&str]) -> Result<Vec<f64>, ScorerError> {
        let features = self.patch_features(image);
        let image_embedding = self.embed(&features);

        candidates
            .iter()
            .map(|candidate| {
                let prompt = self
                    .weights
                    .prompts
                    .iter()
                    .find(|p| p.text == *candidate)
                    .ok_or_else(|| {
                        ScorerError::Scoring(format!("no embedding for candidate {candidate:?}"))
                    })?;

                let mut text_embedding = prompt.embedding.clone();
                normalize(&mut text_embedding);
                let cosine: f64 = image_embedding
                    .iter()
                    .zip(&text_embedding)
                    .map(|(a, b)| a * b)
                    .sum();

                Ok(sigmoid(self.weights.logit_scale * cosine + self.weights.logit_bias))
            })
            .collect()
    }
}

fn normalize(vector: &mut [f64]) {
    let norm: f64 = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
