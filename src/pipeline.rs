use image::{ImageFormat, ImageReader};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::detector::{select_largest, FaceDetector};
use crate::error::{PipelineError, Result};
use crate::inference::{infer_emotion, EmotionClassifier};
use crate::overlay::Annotator;
use crate::report::{ReportDocument, ReportWriter};
use crate::types::{DetectedFace, EmotionResult, ImageAsset};

/// Everything the result page needs after a successful run.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub asset: ImageAsset,
    pub face: DetectedFace,
    pub result: EmotionResult,
    pub report: ReportDocument,
}

/// Localize → infer → annotate → report, over a stored image.
///
/// The models are loaded once by the caller and shared read-only.
pub struct EmotionPipeline {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn EmotionClassifier>,
    annotator: Annotator,
    reports: ReportWriter,
}

impl EmotionPipeline {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        classifier: Arc<dyn EmotionClassifier>,
        annotator: Annotator,
        reports: ReportWriter,
    ) -> Self {
        Self {
            detector,
            classifier,
            annotator,
            reports,
        }
    }

    pub fn run(&self, asset: ImageAsset) -> Result<AnalysisOutcome> {
        let started = Instant::now();

        let reader = ImageReader::open(&asset.path)?.with_guessed_format()?;
        let format = reader.format().unwrap_or(ImageFormat::Png);
        let mut frame = reader.decode()?.to_rgb8();

        // 1. Localize
        let candidates = self.detector.detect(&frame)?;
        debug!("{}: {} face candidate(s)", asset.filename, candidates.len());
        let mut face = select_largest(&candidates).ok_or(PipelineError::NoFace)?;
        face.bbox = face.bbox.clamp_origin();

        // 2. Infer
        let result = infer_emotion(self.classifier.as_ref(), &frame, face.bbox)?;

        // 3. Annotate (overwrites the stored original)
        self.annotator
            .annotate_file(&mut frame, format, &asset.path, face.bbox, &result)?;

        // 4. Report
        let report = self.reports.write(&result, &asset.path)?;

        info!(
            "{}: {} ({:.2}%) in {:?}",
            asset.filename,
            result.emotion,
            result.confidence,
            started.elapsed()
        );

        Ok(AnalysisOutcome {
            asset,
            face,
            result,
            report,
        })
    }
}
