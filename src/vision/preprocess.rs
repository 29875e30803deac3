use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbImage};

use crate::error::Result;

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
    /// Target length of the shorter side after resizing
    pub resize: u32,
    /// Side of the square center crop
    pub crop: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            resize: 256,
            crop: 224,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }
}

/// A batch-of-one `f32` tensor in `NCHW` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub shape: [usize; 4],
}

impl ImageTensor {
    pub fn elem_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Value at channel `c`, row `y`, column `x` of the single image.
    pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        let [_, _, h, w] = self.shape;
        self.data[c * h * w + y * w + x]
    }
}

/// Decode PNG/JPEG/GIF bytes; the format is sniffed from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Resize so the shorter side equals `target`, keeping the aspect ratio.
///
/// The longer side is truncated, matching torchvision's `Resize(int)`.
pub fn resize_shorter_side(image: &DynamicImage, target: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }
    let (new_w, new_h) = if w <= h {
        (target, (target as u64 * h as u64 / w as u64) as u32)
    } else {
        ((target as u64 * w as u64 / h as u64) as u32, target)
    };
    if (new_w, new_h) == (w, h) {
        return image.clone();
    }
    image.resize_exact(new_w.max(1), new_h.max(1), FilterType::Triangle)
}

/// Center crop to `size x size`.
///
/// Offsets are rounded like torchvision's `CenterCrop`; an image smaller
/// than the crop on some axis is zero-padded around it first.
pub fn center_crop(image: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = image.dimensions();
    let image = if w < size || h < size {
        let pad_w = size.max(w);
        let pad_h = size.max(h);
        let mut canvas = RgbImage::new(pad_w, pad_h);
        // the odd pixel of padding goes to the right/bottom
        let left = ((pad_w - w) / 2) as i64;
        let top = ((pad_h - h) / 2) as i64;
        image::imageops::overlay(&mut canvas, &image.to_rgb8(), left, top);
        DynamicImage::from(canvas)
    } else {
        image.clone()
    };

    let (w, h) = image.dimensions();
    let left = ((w - size) as f64 / 2.0).round_ties_even() as u32;
    let top = ((h - size) as f64 / 2.0).round_ties_even() as u32;
    image.crop_imm(left, top, size, size)
}

/// Scale to `[0, 1]`, normalize per channel and flatten to `CHW`.
pub fn to_normalized_chw(image: &DynamicImage, mean: &[f32; 3], std: &[f32; 3]) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let num_pixels = (rgb.width() * rgb.height()) as usize;
    let mut out = vec![0.0f32; 3 * num_pixels];

    for (i, pixel) in rgb.pixels().enumerate() {
        for c in 0..3 {
            out[c * num_pixels + i] = (pixel[c] as f32 / 255.0 - mean[c]) / std[c];
        }
    }
    out
}

/// The fixed evaluation transform shared by both detectors.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Shape of every tensor this preprocessor produces.
    pub fn input_shape(&self) -> [usize; 4] {
        let side = self.config.crop as usize;
        [1, 3, side, side]
    }

    pub fn apply(&self, image: &DynamicImage) -> ImageTensor {
        let resized = resize_shorter_side(image, self.config.resize);
        let cropped = center_crop(&resized, self.config.crop);
        ImageTensor {
            data: to_normalized_chw(&cropped, &self.config.mean, &self.config.std),
            shape: self.input_shape(),
        }
    }

    pub fn apply_bytes(&self, bytes: &[u8]) -> Result<ImageTensor> {
        let image = decode_image(bytes)?;
        Ok(self.apply(&image))
    }
}
