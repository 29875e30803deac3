//! Image preprocessing for the classifiers.
//!
//! Both detectors were fine-tuned from ImageNet backbones and expect the same
//! evaluation transform: shorter-side resize, center crop, scale to `[0, 1]`,
//! per-channel ImageNet normalization, `NCHW` layout.

pub mod preprocess;

pub use preprocess::{
    center_crop, decode_image, resize_shorter_side, to_normalized_chw, ImageTensor,
    PreprocessConfig, Preprocessor, IMAGENET_MEAN, IMAGENET_STD,
};
