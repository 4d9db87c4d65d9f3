// Next-symbol prediction models.
//
// The sampler treats the model as a black box with a single contract: given
// a `(context_length, vocab_size)` one-hot window of the most recent codes,
// return a probability distribution over the next code. `SequenceModel` is
// that contract.
//
// `DenseModel` is the loadable artifact format shipped with this crate: one
// fully connected layer over the flattened window followed by a softmax,
// stored as JSON. Weight rows are indexed by output code; columns follow the
// window in row-major order (step 0's vocabulary first).

use crate::error::{MelodyError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A trained next-symbol predictor.
pub trait SequenceModel {
    /// Number of codes the model predicts over.
    fn vocab_size(&self) -> usize;

    /// Window length the model requires, if it is fixed.
    fn context_length(&self) -> Option<usize> {
        None
    }

    /// Probability of each next code given the one-hot window.
    fn predict(&self, window: &Array2<f32>) -> Result<Vec<f32>>;
}

/// One-hot encode a window of codes into a `(codes.len(), vocab_size)` matrix.
///
/// Codes must already be valid (`< vocab_size`); they come from the
/// vocabulary, which guarantees that.
pub fn one_hot(codes: &[usize], vocab_size: usize) -> Array2<f32> {
    let mut window = Array2::<f32>::zeros((codes.len(), vocab_size));
    for (row, &code) in codes.iter().enumerate() {
        window[[row, code]] = 1.0;
    }
    window
}

/// Numerically stable softmax.
pub fn softmax(logits: &Array1<f32>) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// On-disk layout of a `DenseModel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseModelFile {
    pub context_length: usize,
    pub vocab_size: usize,
    /// `vocab_size` rows of `context_length * vocab_size` weights.
    pub weights: Vec<Vec<f32>>,
    /// One bias per output code.
    pub bias: Vec<f32>,
}

/// Single dense layer + softmax over a flattened one-hot window.
#[derive(Debug, Clone)]
pub struct DenseModel {
    context_length: usize,
    vocab_size: usize,
    weights: Array2<f32>, // vocab_size x (context_length * vocab_size)
    bias: Array1<f32>,
}

impl DenseModel {
    /// Load from a JSON model file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| MelodyError::ModelLoad(format!("{}: {e}", path.display())))?;
        let file: DenseModelFile = serde_json::from_str(&data)
            .map_err(|e| MelodyError::ModelLoad(format!("{}: {e}", path.display())))?;
        let model = Self::from_file(file)?;
        log::debug!(
            "Loaded dense model from {} (context {}, vocabulary {})",
            path.display(),
            model.context_length,
            model.vocab_size
        );
        Ok(model)
    }

    /// Validate shapes and build the model from its serialized form.
    pub fn from_file(file: DenseModelFile) -> Result<Self> {
        let DenseModelFile { context_length, vocab_size, weights, bias } = file;
        if context_length == 0 || vocab_size == 0 {
            return Err(MelodyError::ModelLoad(format!(
                "context_length ({context_length}) and vocab_size ({vocab_size}) must be positive"
            )));
        }
        let inputs = context_length * vocab_size;
        if weights.len() != vocab_size {
            return Err(MelodyError::ModelLoad(format!(
                "expected {vocab_size} weight rows, found {}",
                weights.len()
            )));
        }
        if let Some((row, w)) = weights.iter().enumerate().find(|(_, w)| w.len() != inputs) {
            return Err(MelodyError::ModelLoad(format!(
                "weight row {row} has {} columns, expected {inputs}",
                w.len()
            )));
        }
        if bias.len() != vocab_size {
            return Err(MelodyError::ModelLoad(format!(
                "expected {vocab_size} biases, found {}",
                bias.len()
            )));
        }
        let flat: Vec<f32> = weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((vocab_size, inputs), flat)
            .map_err(|e| MelodyError::ModelLoad(e.to_string()))?;
        Ok(DenseModel {
            context_length,
            vocab_size,
            weights,
            bias: Array1::from(bias),
        })
    }
}

impl SequenceModel for DenseModel {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn context_length(&self) -> Option<usize> {
        Some(self.context_length)
    }

    fn predict(&self, window: &Array2<f32>) -> Result<Vec<f32>> {
        let shape = window.dim();
        if shape != (self.context_length, self.vocab_size) {
            return Err(MelodyError::Inference(format!(
                "window shape {shape:?} does not match model input ({}, {})",
                self.context_length, self.vocab_size
            )));
        }
        let input: Array1<f32> = window.iter().copied().collect();
        let logits = self.weights.dot(&input) + &self.bias;
        Ok(softmax(&logits))
    }
}
