use anyhow::{Context, Result};
use image::{imageops::FilterType, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tracing::debug;

use crate::types::{DetectedFace, FaceBox};

/// Face detection backend.
///
/// Implementations return every candidate they find; choosing one is the
/// caller's business (see [`select_largest`]).
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<DetectedFace>>;
}

/// Largest box by `width * height`; the first one wins on exact ties.
pub fn select_largest(faces: &[DetectedFace]) -> Option<DetectedFace> {
    let mut best: Option<DetectedFace> = None;
    for face in faces {
        match best {
            Some(b) if face.bbox.area() <= b.bbox.area() => {}
            _ => best = Some(*face),
        }
    }
    best
}

const INPUT_W: u32 = 320;
const INPUT_H: u32 = 240;
const CENTER_VARIANCE: f32 = 0.1;
const SIZE_VARIANCE: f32 = 0.2;

/// UltraFace (RFB-320) ONNX detector.
pub struct UltraFaceDetector {
    session: Mutex<Session>,
    anchors: Vec<(f32, f32, f32, f32)>, // cx, cy, w, h
    score_threshold: f32,
    iou_threshold: f32,
}

impl UltraFaceDetector {
    pub fn new(
        model_path: &Path,
        score_threshold: f32,
        iou_threshold: f32,
        intra_threads: usize,
    ) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers([
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])?
            .commit_from_file(model_path)
            .with_context(|| format!("loading face detector {}", model_path.display()))?;

        let anchors = generate_anchors(INPUT_W as usize, INPUT_H as usize);
        Ok(Self {
            session: Mutex::new(session),
            anchors,
            score_threshold,
            iou_threshold,
        })
    }

    fn decode(&self, scores_raw: &[f32], boxes_raw: &[f32]) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for (i, &(ax, ay, aw, ah)) in self.anchors.iter().enumerate() {
            let Some(&score) = scores_raw.get(i * 2 + 1) else {
                break;
            };
            if score <= self.score_threshold {
                continue;
            }
            let Some(enc) = boxes_raw.get(i * 4..i * 4 + 4) else {
                break;
            };

            let cx = enc[0] * CENTER_VARIANCE * aw + ax;
            let cy = enc[1] * CENTER_VARIANCE * ah + ay;
            let w = (enc[2] * SIZE_VARIANCE).exp() * aw;
            let h = (enc[3] * SIZE_VARIANCE).exp() * ah;

            // Normalized corners
            candidates.push(Candidate {
                corners: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
                score,
            });
        }

        candidates
    }
}

impl FaceDetector for UltraFaceDetector {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<DetectedFace>> {
        // Resize to 320x240, HWC -> NCHW, normalize (pixel - 127) / 128
        let resized = image::imageops::resize(frame, INPUT_W, INPUT_H, FilterType::Triangle);

        let plane = (INPUT_W * INPUT_H) as usize;
        let mut input_data = vec![0.0f32; 3 * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                input_data[c * plane + i] = (pixel[c] as f32 - 127.0) / 128.0;
            }
        }

        let input_tensor = Tensor::from_array((
            vec![1_i64, 3, INPUT_H as i64, INPUT_W as i64],
            input_data,
        ))?;

        let candidates = {
            let mut session = self.session.lock();
            let outputs = session.run(ort::inputs![input_tensor])?;
            let (_scores_shape, scores_data) = outputs["scores"].try_extract_tensor::<f32>()?;
            let (_boxes_shape, boxes_data) = outputs["boxes"].try_extract_tensor::<f32>()?;
            self.decode(scores_data, boxes_data)
        };

        let kept = nms(candidates, self.iou_threshold);
        debug!("UltraFace kept {} face(s)", kept.len());

        // Scale back to the original frame
        let sx = frame.width() as f32;
        let sy = frame.height() as f32;
        Ok(kept
            .into_iter()
            .map(|c| {
                let [x1, y1, x2, y2] = c.corners;
                DetectedFace {
                    bbox: FaceBox::new(
                        (x1 * sx).round() as i32,
                        (y1 * sy).round() as i32,
                        ((x2 - x1) * sx).round() as i32,
                        ((y2 - y1) * sy).round() as i32,
                    ),
                    confidence: c.score,
                }
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    corners: [f32; 4], // x1, y1, x2, y2
    score: f32,
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = inter_w * inter_h;

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy suppression, highest score first.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates {
        if keep.iter().all(|k| iou(&k.corners, &c.corners) <= iou_threshold) {
            keep.push(c);
        }
    }
    keep
}

fn generate_anchors(width: usize, height: usize) -> Vec<(f32, f32, f32, f32)> {
    // UltraFace configs
    let shrinkage_list = [8, 16, 32, 64];
    let min_boxes: [&[f32]; 4] = [
        &[10.0, 16.0, 24.0],
        &[32.0, 48.0],
        &[64.0, 96.0],
        &[128.0, 192.0, 256.0],
    ];
    let mut anchors = Vec::new();

    let w = width as f32;
    let h = height as f32;

    for (i, &shrinkage) in shrinkage_list.iter().enumerate() {
        let feature_h = (h / shrinkage as f32).ceil() as usize;
        let feature_w = (w / shrinkage as f32).ceil() as usize;

        for v in 0..feature_h {
            for u in 0..feature_w {
                let cx = (u as f32 * shrinkage as f32 + shrinkage as f32 / 2.0) / w;
                let cy = (v as f32 * shrinkage as f32 + shrinkage as f32 / 2.0) / h;

                for &min_box in min_boxes[i] {
                    anchors.push((cx, cy, min_box / w, min_box / h));
                }
            }
        }
    }
    anchors
}
