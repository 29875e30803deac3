use serde::Serialize;

use crate::error::{AgriError, Result};
use crate::vision::ImageTensor;

/// Anything that maps a preprocessed image to one logit per class.
pub trait Classifier: Send + Sync {
    fn logits(&self, input: &ImageTensor) -> Result<Vec<f32>>;

    /// Width of the logit vector.
    fn num_outputs(&self) -> usize;
}

/// Numerically-stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits
        .iter()
        .map(|&v| if v.is_nan() { 0.0 } else { (v - max).exp() })
        .collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Argmax of a forward pass plus its softmax confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub index: usize,
    pub confidence: f32,
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Ties resolve to the lowest index; NaN logits never win.
    pub fn from_logits(logits: &[f32]) -> Result<Self> {
        let index = logits
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None::<(usize, f32)>, |best, (i, &v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
            .map(|(i, _)| i)
            .ok_or_else(|| AgriError::Inference("model returned no usable logits".to_string()))?;

        let probabilities = softmax(logits);
        Ok(Self {
            index,
            confidence: probabilities[index],
            probabilities,
        })
    }

    /// The `k` most probable class indices with their probabilities.
    pub fn top_k(&self, k: usize) -> Vec<(usize, f32)> {
        let mut ranked: Vec<(usize, f32)> =
            self.probabilities.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
    }
}
