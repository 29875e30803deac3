//! Classifier backed by an ONNX export, executed with `tract-onnx`.
//!
//! The fine-tuned ResNet/EfficientNet checkpoints are exported to ONNX once;
//! the service then needs neither Python nor a GPU runtime.

use std::path::Path;

use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::{AgriError, Result};
use crate::ml::Classifier;
use crate::vision::ImageTensor;

type Plan = TypedRunnableModel<TypedModel>;

/// An optimized ONNX graph pinned to one `[N, C, H, W]` input shape.
#[derive(Clone)]
pub struct OnnxModel {
    plan: Plan,
    input_shape: [usize; 4],
    output_dim: usize,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("input_shape", &self.input_shape)
            .field("output_dim", &self.output_dim)
            .finish()
    }
}

impl OnnxModel {
    /// Load weights from `path` and compile them for `input_shape`.
    ///
    /// The class count is read off the graph by running one all-zero image
    /// through it, so the caller can check it against the label list.
    pub fn load(path: &Path, input_shape: [usize; 4]) -> Result<Self> {
        if input_shape.contains(&0) {
            return Err(AgriError::Validation(format!(
                "model input shape {input_shape:?} has an empty dimension"
            )));
        }
        if !path.is_file() {
            return Err(AgriError::ModelLoad(format!(
                "weights not found at {}",
                path.display()
            )));
        }

        let plan = compile(path, input_shape)
            .map_err(|e| AgriError::ModelLoad(format!("{}: {e}", path.display())))?;

        let probe = forward(&plan, input_shape, vec![0.0; input_shape.iter().product()])
            .map_err(|e| AgriError::ModelLoad(format!("probe run failed: {e}")))?;
        if probe.is_empty() {
            return Err(AgriError::ModelLoad(
                "model produced an empty output".to_string(),
            ));
        }
        debug!(
            "Compiled {} for input {:?} with {} outputs",
            path.display(),
            input_shape,
            probe.len()
        );

        Ok(Self {
            plan,
            input_shape,
            output_dim: probe.len(),
        })
    }

    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    /// Raw logits for one preprocessed image.
    pub fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        let expected: usize = self.input_shape.iter().product();
        if input.len() != expected {
            return Err(AgriError::Validation(format!(
                "expected {} input values for shape {:?}, got {}",
                expected,
                self.input_shape,
                input.len()
            )));
        }
        forward(&self.plan, self.input_shape, input.to_vec())
            .map_err(|e| AgriError::Inference(e.to_string()))
    }
}

fn compile(path: &Path, input_shape: [usize; 4]) -> TractResult<Plan> {
    tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), input_shape.to_vec()),
        )?
        .into_optimized()?
        .into_runnable()
}

/// One pass through the plan; the first output is flattened.
fn forward(plan: &Plan, shape: [usize; 4], data: Vec<f32>) -> TractResult<Vec<f32>> {
    let input = tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(&shape), data)?;
    let outputs = plan.run(tvec!(input.into_tvalue()))?;
    let first = outputs
        .first()
        .ok_or_else(|| anyhow::anyhow!("graph has no outputs"))?;
    Ok(first.to_array_view::<f32>()?.iter().copied().collect())
}

impl Classifier for OnnxModel {
    fn logits(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        if input.shape != self.input_shape {
            return Err(AgriError::Validation(format!(
                "tensor shape {:?} does not match model input {:?}",
                input.shape, self.input_shape
            )));
        }
        self.predict(&input.data)
    }

    fn num_outputs(&self) -> usize {
        self.output_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::fixtures;

    #[test]
    fn empty_dimensions_are_rejected_before_touching_disk() {
        let err = OnnxModel::load(Path::new("missing.onnx"), [1, 3, 0, 224]).unwrap_err();
        assert!(matches!(err, AgriError::Validation(_)));
    }

    #[test]
    fn missing_weights_are_a_load_error() {
        let err = OnnxModel::load(Path::new("no/such/model.onnx"), [1, 3, 224, 224]).unwrap_err();
        assert!(matches!(err, AgriError::ModelLoad(_)));
    }

    #[test]
    fn garbage_weights_are_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"not a protobuf").unwrap();

        let err = OnnxModel::load(&path, [1, 3, 224, 224]).unwrap_err();
        assert!(matches!(err, AgriError::ModelLoad(_)));
    }

    #[test]
    fn output_width_comes_from_the_zero_image_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::pooled_linear(
            dir.path(),
            [&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[1.0, -1.0, 0.0]],
            &[0.5, 0.5, 0.0],
        );

        let model = OnnxModel::load(&path, [1, 3, 2, 2]).unwrap();
        assert_eq!(model.num_outputs(), 3);
        assert_eq!(model.input_shape(), [1, 3, 2, 2]);
    }

    #[test]
    fn logits_follow_the_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::pooled_linear(
            dir.path(),
            [&[1.0, 0.0], &[0.0, 1.0], &[1.0, -1.0]],
            &[0.5, 0.5],
        );
        let model = OnnxModel::load(&path, [1, 3, 2, 2]).unwrap();

        // channel means 1, 2, 3
        let mut data = vec![1.0; 4];
        data.extend([2.0; 4]);
        data.extend([1.0, 3.0, 5.0, 3.0]);
        let logits = model.predict(&data).unwrap();
        assert_eq!(logits.len(), 2);
        assert!((logits[0] - 4.5).abs() < 1e-5);
        assert!((logits[1] + 0.5).abs() < 1e-5);

        let tensor = ImageTensor {
            data,
            shape: [1, 3, 2, 2],
        };
        assert_eq!(model.logits(&tensor).unwrap(), logits);
    }

    #[test]
    fn wrong_input_sizes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::pooled_linear(dir.path(), [&[1.0], &[1.0], &[1.0]], &[0.0]);
        let model = OnnxModel::load(&path, [1, 3, 2, 2]).unwrap();

        assert!(matches!(model.predict(&[0.0; 3]), Err(AgriError::Validation(_))));
        let tensor = ImageTensor {
            data: vec![0.0; 27],
            shape: [1, 3, 3, 3],
        };
        assert!(matches!(model.logits(&tensor), Err(AgriError::Validation(_))));
    }
}
