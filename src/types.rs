use std::path::PathBuf;

use crate::emotion::Emotion;

/// Axis-aligned face box in source pixel coordinates, origin top-left.
///
/// Coordinates are signed because detectors happily report boxes that start
/// slightly outside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Clamps the top-left corner to the image origin. Width and height are
    /// left alone, so the box may still run past the right/bottom edge.
    pub fn clamp_origin(self) -> Self {
        Self {
            x: self.x.max(0),
            y: self.y.max(0),
            ..self
        }
    }
}

/// A single detector candidate.
#[derive(Debug, Clone, Copy)]
pub struct DetectedFace {
    pub bbox: FaceBox,
    pub confidence: f32,
}

/// Outcome of classifying one face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionResult {
    pub emotion: Emotion,
    /// Top class probability as a percentage, rounded to two decimals.
    pub confidence: f64,
}

impl EmotionResult {
    /// Picks the arg-max class (first index wins on ties) and derives the
    /// percentage confidence from its probability.
    pub fn from_probabilities(probs: &[f32]) -> Option<Self> {
        if probs.len() != Emotion::ALL.len() {
            return None;
        }

        let mut best_idx = 0;
        for (i, &p) in probs.iter().enumerate().skip(1) {
            if p > probs[best_idx] {
                best_idx = i;
            }
        }

        Some(Self {
            emotion: Emotion::from_index(best_idx)?,
            confidence: round2(probs[best_idx] as f64 * 100.0),
        })
    }

    /// Caption text used on the annotated image.
    pub fn caption(&self) -> String {
        format!(
            "{} {} ({:.2}%)",
            self.emotion.emoji(),
            self.emotion.label(),
            self.confidence
        )
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// An image stored under the uploads directory.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub filename: String,
    pub path: PathBuf,
}

impl ImageAsset {
    /// Path relative to the static root, as used in the result page.
    pub fn relative_path(&self) -> String {
        format!("uploads/{}", self.filename)
    }
}
