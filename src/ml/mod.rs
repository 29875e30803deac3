//! Classifier abstraction and the ONNX runtime behind it.

pub mod classifier;
pub mod onnx;

#[cfg(test)]
pub(crate) mod fixtures;

pub use classifier::{softmax, Classifier, Prediction};
pub use onnx::OnnxModel;
