use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, GrayImage, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;

use crate::emotion::Emotion;
use crate::error::PipelineError;
use crate::types::{EmotionResult, FaceBox};

/// Classifier input side length.
pub const INPUT_SIZE: u32 = 48;

/// Emotion classification backend.
pub trait EmotionClassifier: Send + Sync {
    /// `input` is a 48x48 row-major grid of samples in [0, 1]. Returns one
    /// probability per [`Emotion::ALL`] entry, in that order.
    fn classify(&self, input: &[f32]) -> Result<Vec<f32>>;
}

/// Keras-exported 48x48 grayscale classifier converted to ONNX (NHWC input).
pub struct OnnxEmotionClassifier {
    session: Mutex<Session>,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &Path, intra_threads: usize) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(model_path)
            .with_context(|| format!("loading emotion classifier {}", model_path.display()))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, input: &[f32]) -> Result<Vec<f32>> {
        let side = INPUT_SIZE as i64;
        let tensor = Tensor::from_array((vec![1_i64, side, side, 1], input.to_vec()))?;

        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![tensor])?;
        let (_shape, probs) = outputs[0].try_extract_tensor::<f32>()?;

        if probs.len() != Emotion::ALL.len() {
            return Err(anyhow!(
                "classifier returned {} scores, expected {}",
                probs.len(),
                Emotion::ALL.len()
            ));
        }
        Ok(probs.to_vec())
    }
}

/// Crops the face, converts to grayscale and resizes to 48x48.
///
/// Only the origin is clamped; a box running past the right or bottom edge
/// is truncated to the image.
pub fn crop_face(frame: &RgbImage, bbox: FaceBox) -> Result<GrayImage, PipelineError> {
    let b = bbox.clamp_origin();
    let (x, y) = (b.x as u32, b.y as u32);
    let (w, h) = (b.width.max(0) as u32, b.height.max(0) as u32);

    let crop = image::imageops::crop_imm(frame, x, y, w, h).to_image();
    if crop.width() == 0 || crop.height() == 0 {
        return Err(PipelineError::EmptyFaceRegion {
            x,
            y,
            width: w,
            height: h,
        });
    }

    let gray = image::DynamicImage::ImageRgb8(crop).to_luma8();
    Ok(image::imageops::resize(
        &gray,
        INPUT_SIZE,
        INPUT_SIZE,
        FilterType::Triangle,
    ))
}

/// Row-major samples scaled to [0, 1].
pub fn normalize(face: &GrayImage) -> Vec<f32> {
    face.pixels().map(|p| p[0] as f32 / 255.0).collect()
}

/// Crop, normalize, classify.
pub fn infer_emotion(
    classifier: &dyn EmotionClassifier,
    frame: &RgbImage,
    bbox: FaceBox,
) -> Result<EmotionResult, PipelineError> {
    let face = crop_face(frame, bbox)?;
    let probs = classifier.classify(&normalize(&face))?;

    EmotionResult::from_probabilities(&probs).ok_or_else(|| {
        PipelineError::Model(anyhow!(
            "classifier returned {} scores, expected {}",
            probs.len(),
            Emotion::ALL.len()
        ))
    })
}
