use anyhow::{bail, Context};
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::detector::UltraFaceDetector;
use crate::error::PipelineError;
use crate::inference::OnnxEmotionClassifier;
use crate::ingest::{ImageStore, ImageSubmission};
use crate::overlay::Annotator;
use crate::page::Page;
use crate::pipeline::EmotionPipeline;
use crate::report::ReportWriter;

const FAILURE_MESSAGE: &str = "Something went wrong while analyzing the image.";

#[derive(Clone)]
pub struct AppState {
    pub store: ImageStore,
    pub pipeline: Arc<EmotionPipeline>,
}

impl AppState {
    /// Loads both models and prepares the content directories. Any failure
    /// here keeps the server from starting.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let paths = &config.paths;
        for model in [&paths.detector_model, &paths.classifier_model] {
            if !model.exists() {
                bail!("model file not found: {}", model.display());
            }
        }

        info!("Loading face detector from {}", paths.detector_model.display());
        let detector = UltraFaceDetector::new(
            &paths.detector_model,
            config.detector.score_threshold,
            config.detector.iou_threshold,
            config.detector.intra_threads,
        )?;

        info!(
            "Loading emotion classifier from {}",
            paths.classifier_model.display()
        );
        let classifier =
            OnnxEmotionClassifier::new(&paths.classifier_model, config.detector.intra_threads)?;

        let store = ImageStore::new(paths.upload_dir()).context("creating uploads directory")?;
        let reports = ReportWriter::new(paths.report_dir(), config.report.clone())
            .context("creating report directory")?;

        let pipeline = EmotionPipeline::new(
            Arc::new(detector),
            Arc::new(classifier),
            Annotator::new(&config.annotation),
            reports,
        );

        Ok(Self {
            store,
            pipeline: Arc::new(pipeline),
        })
    }
}

pub fn router(state: AppState, static_dir: &Path, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index).post(analyze))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(Page::Form.render())
}

async fn analyze(State(state): State<AppState>, request: Request) -> Response {
    let submission = match read_submission(request).await {
        Ok(s) => s,
        Err(msg) => {
            warn!("Rejected submission: {}", msg);
            return page(StatusCode::BAD_REQUEST, Page::Error(FAILURE_MESSAGE));
        }
    };

    // Decoding, inference and file writes all block
    let joined = tokio::task::spawn_blocking(move || {
        let asset = state.store.ingest(submission)?;
        state.pipeline.run(asset)
    })
    .await;

    match joined {
        Ok(Ok(outcome)) => page(StatusCode::OK, Page::Result(&outcome)),
        Ok(Err(e)) => failure(e),
        Err(e) => {
            error!("Pipeline task failed: {}", e);
            page(StatusCode::INTERNAL_SERVER_ERROR, Page::Error(FAILURE_MESSAGE))
        }
    }
}

fn failure(e: PipelineError) -> Response {
    match e.user_message() {
        Some(msg) => {
            info!("{}", msg);
            page(StatusCode::OK, Page::Error(msg))
        }
        None => {
            error!("Request failed: {}", e);
            page(StatusCode::INTERNAL_SERVER_ERROR, Page::Error(FAILURE_MESSAGE))
        }
    }
}

fn page(status: StatusCode, page: Page<'_>) -> Response {
    (status, Html(page.render())).into_response()
}

/// Pulls `file` / `webcam_image` out of a multipart or urlencoded body.
/// Any other content type carries no image.
async fn read_submission(request: Request) -> Result<Option<ImageSubmission>, String> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| e.body_text())?;

        let mut upload = None;
        let mut webcam = None;
        while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await.map_err(|e| e.body_text())?;
                    upload = Some((filename, bytes.to_vec()));
                }
                Some("webcam_image") => {
                    webcam = Some(field.text().await.map_err(|e| e.body_text())?);
                }
                _ => {}
            }
        }
        Ok(ImageSubmission::select(upload, webcam))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(mut fields) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|e| e.body_text())?;
        Ok(ImageSubmission::select(None, fields.remove("webcam_image")))
    } else {
        Ok(None)
    }
}
