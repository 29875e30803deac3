use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::error::{AgriError, Result};
use crate::labels::{ClassNames, DiseaseProfile, Variant};
use crate::ml::{Classifier, OnnxModel, Prediction};
use crate::vision::{ImageTensor, PreprocessConfig, Preprocessor};

/// One alternative from the ranked output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub disease: String,
    pub confidence: f32,
}

/// Outcome of a single image through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub detected: bool,
    /// Display name of the predicted class
    pub disease: String,
    /// Softmax probability of the predicted class, in `[0, 1]`
    pub confidence: f32,
    pub treatment: String,
    pub message: String,
    pub class_index: usize,
    pub raw_class: String,
    pub top_k: Vec<RankedClass>,
    pub inference_ms: f64,
}

/// Preprocessor, classifier and label interpreter wired together.
///
/// The classifier is optional: a service whose weights are missing still
/// starts and reports itself as not loaded.
#[derive(Clone)]
pub struct InferencePipeline {
    preprocessor: Preprocessor,
    classifier: Option<Arc<dyn Classifier>>,
    classes: ClassNames,
    profile: DiseaseProfile,
    top_k: usize,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("variant", &self.profile.variant())
            .field("classes", &self.classes.len())
            .field("model_loaded", &self.is_loaded())
            .finish()
    }
}

impl InferencePipeline {
    pub fn new(
        preprocessor: Preprocessor,
        classifier: Option<Arc<dyn Classifier>>,
        classes: ClassNames,
        profile: DiseaseProfile,
    ) -> Self {
        Self {
            preprocessor,
            classifier,
            classes,
            profile,
            top_k: 3,
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Build the pipeline described by `model`, loading weights once.
    ///
    /// A missing or unreadable weight file leaves the pipeline without a
    /// classifier instead of failing; a class list that disagrees with the
    /// model's output width is a hard error.
    pub fn from_config(model: &ModelConfig) -> Result<Self> {
        let classes = ClassNames::resolve(model.labels.as_deref(), model.dataset_dir.as_deref())
            .unwrap_or_else(|e| {
                warn!("Could not determine class names: {}", e);
                ClassNames::default()
            });
        info!(
            variant = %model.variant,
            "Loaded {} classes: {:?}",
            classes.len(),
            classes.as_slice()
        );

        let preprocessor = Preprocessor::new(PreprocessConfig {
            resize: model.resize,
            crop: model.crop,
            ..PreprocessConfig::default()
        });

        let classifier = if classes.is_empty() {
            warn!("Cannot load model: class count is zero");
            None
        } else {
            Self::load_classifier(&model.weights, &preprocessor, &classes)?
        };

        Ok(Self::new(preprocessor, classifier, classes, model.variant.profile())
            .with_top_k(model.top_k))
    }

    fn load_classifier(
        weights: &Path,
        preprocessor: &Preprocessor,
        classes: &ClassNames,
    ) -> Result<Option<Arc<dyn Classifier>>> {
        match OnnxModel::load(weights, preprocessor.input_shape()) {
            Ok(model) => {
                if model.num_outputs() != classes.len() {
                    return Err(AgriError::ModelLoad(format!(
                        "model at {} has {} outputs but {} classes are configured",
                        weights.display(),
                        model.num_outputs(),
                        classes.len()
                    )));
                }
                info!("Model loaded successfully from {}", weights.display());
                Ok(Some(Arc::new(model)))
            }
            Err(e) => {
                warn!("No usable model ({}); predictions will be refused", e);
                Ok(None)
            }
        }
    }

    pub fn variant(&self) -> Variant {
        self.profile.variant()
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn classes(&self) -> &ClassNames {
        &self.classes
    }

    pub fn profile(&self) -> &DiseaseProfile {
        &self.profile
    }

    /// Decode, preprocess, classify and interpret one uploaded image.
    pub fn run(&self, bytes: &[u8]) -> Result<Detection> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(AgriError::ModelUnavailable)?;
        let tensor = self.preprocessor.apply_bytes(bytes)?;
        self.classify(classifier.as_ref(), &tensor)
    }

    /// Same as [`run`](Self::run) for an image on disk.
    pub fn run_path(&self, path: &Path) -> Result<Detection> {
        let bytes = std::fs::read(path)?;
        self.run(&bytes)
    }

    fn classify(&self, classifier: &dyn Classifier, tensor: &ImageTensor) -> Result<Detection> {
        let started = Instant::now();
        let logits = classifier.logits(tensor)?;
        let prediction = Prediction::from_logits(&logits)?;
        let inference_ms = started.elapsed().as_secs_f64() * 1000.0;

        let raw_class = self.class_name(prediction.index)?;
        let interpretation = self.profile.interpret(raw_class);

        let top_k = prediction
            .top_k(self.top_k)
            .into_iter()
            .filter_map(|(i, p)| {
                self.classes.get(i).map(|name| RankedClass {
                    disease: self.profile.display_name(name),
                    confidence: p,
                })
            })
            .collect();

        debug!(
            class = raw_class,
            confidence = prediction.confidence,
            detected = interpretation.detected,
            "Prediction complete in {:.1}ms",
            inference_ms
        );

        Ok(Detection {
            detected: interpretation.detected,
            disease: interpretation.display,
            confidence: prediction.confidence,
            treatment: interpretation.treatment,
            message: interpretation.message,
            class_index: prediction.index,
            raw_class: raw_class.to_string(),
            top_k,
            inference_ms,
        })
    }

    fn class_name(&self, index: usize) -> Result<&str> {
        self.classes.get(index).ok_or_else(|| {
            AgriError::Internal(format!(
                "predicted index {} outside class list of {}",
                index,
                self.classes.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    struct FixedLogits(Vec<f32>);

    impl Classifier for FixedLogits {
        fn logits(&self, _input: &ImageTensor) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn num_outputs(&self) -> usize {
            self.0.len()
        }
    }

    fn png() -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::from(RgbImage::from_pixel(32, 24, Rgb([40, 160, 40])))
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn pipeline(variant: Variant, classes: &[&str], logits: Vec<f32>) -> InferencePipeline {
        InferencePipeline::new(
            Preprocessor::new(PreprocessConfig {
                resize: 16,
                crop: 8,
                ..PreprocessConfig::default()
            }),
            Some(Arc::new(FixedLogits(logits))),
            ClassNames::new(classes.iter().map(|s| s.to_string()).collect()),
            variant.profile(),
        )
    }

    #[test]
    fn crop_disease_gets_treatment_and_ranked_alternatives() {
        let p = pipeline(
            Variant::Crop,
            &["Apple___healthy", "Tomato___Late_blight", "Corn___Common_rust"],
            vec![0.5, 4.0, 1.0],
        )
        .with_top_k(2);

        let d = p.run(&png()).unwrap();
        assert!(d.detected);
        assert_eq!(d.disease, "Tomato Late Blight");
        assert_eq!(d.message, "Disease detected: Tomato Late Blight");
        assert!(d.treatment.starts_with("Apply fungicide and avoid overhead watering"));
        assert_eq!(d.class_index, 1);
        assert!(d.confidence > 0.5 && d.confidence <= 1.0);
        assert_eq!(d.top_k.len(), 2);
        assert_eq!(d.top_k[1].disease, "Corn Common Rust");
    }

    #[test]
    fn healthy_cattle() {
        let p = pipeline(Variant::Cattle, &["lumpy", "normal"], vec![-2.0, 3.0]);
        let d = p.run(&png()).unwrap();
        assert!(!d.detected);
        assert_eq!(d.message, "Animal is healthy: Normal");
        assert!(d.treatment.starts_with("No treatment needed - animal"));
    }

    #[test]
    fn missing_model_is_reported_before_decoding() {
        let p = InferencePipeline::new(
            Preprocessor::default(),
            None,
            ClassNames::new(vec!["healthy".into()]),
            DiseaseProfile::crop(),
        );
        assert!(!p.is_loaded());
        assert!(matches!(p.run(b"junk"), Err(AgriError::ModelUnavailable)));
    }

    #[test]
    fn logits_wider_than_class_list_are_an_internal_error() {
        let p = pipeline(Variant::Crop, &["Apple___healthy"], vec![0.0, 9.0]);
        assert!(matches!(p.run(&png()), Err(AgriError::Internal(_))));
    }

    #[test]
    fn from_config_without_weights_starts_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Potato___healthy")).unwrap();
        std::fs::create_dir(dir.path().join("Potato___Early_blight")).unwrap();

        let model = ModelConfig {
            variant: Variant::Crop,
            weights: dir.path().join("absent.onnx"),
            labels: None,
            dataset_dir: Some(dir.path().to_path_buf()),
            resize: 256,
            crop: 224,
            top_k: 3,
        };
        let p = InferencePipeline::from_config(&model).unwrap();
        assert!(!p.is_loaded());
        assert_eq!(p.classes().len(), 2);
        assert_eq!(p.classes().get(0), Some("Potato___Early_blight"));
    }

    fn fixture_config(dir: &Path, labels: &str) -> ModelConfig {
        // red channel drives class 0, green drives class 1
        let weights = crate::ml::fixtures::pooled_linear(
            dir,
            [&[4.0, 0.0], &[0.0, 4.0], &[0.0, 0.0]],
            &[0.0, 0.0],
        );
        let labels_path = dir.join("labels.txt");
        std::fs::write(&labels_path, labels).unwrap();
        ModelConfig {
            variant: Variant::Crop,
            weights,
            labels: Some(labels_path),
            dataset_dir: None,
            resize: 16,
            crop: 8,
            top_k: 2,
        }
    }

    #[test]
    fn from_config_runs_a_real_graph_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let model = fixture_config(dir.path(), "Tomato___Late_blight\nTomato___healthy\n");

        let p = InferencePipeline::from_config(&model).unwrap();
        assert!(p.is_loaded());

        // png() is mostly green
        let d = p.run(&png()).unwrap();
        assert_eq!(d.class_index, 1);
        assert_eq!(d.raw_class, "Tomato___healthy");
        assert!(!d.detected);
        assert_eq!(d.top_k.len(), 2);
    }

    #[test]
    fn from_config_rejects_class_count_that_disagrees_with_the_model() {
        let dir = tempfile::tempdir().unwrap();
        for labels in ["only_one\n", "a\nb\nc\n"] {
            let model = fixture_config(dir.path(), labels);
            let err = InferencePipeline::from_config(&model).unwrap_err();
            assert!(matches!(err, AgriError::ModelLoad(_)), "{labels:?}: {err}");
        }
    }
}
