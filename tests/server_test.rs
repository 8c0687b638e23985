use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use emotion_lens::config::{AnnotationConfig, ReportConfig};
use emotion_lens::detector::FaceDetector;
use emotion_lens::inference::EmotionClassifier;
use emotion_lens::ingest::ImageStore;
use emotion_lens::overlay::Annotator;
use emotion_lens::report::ReportWriter;
use emotion_lens::server::{router, AppState};
use emotion_lens::types::{DetectedFace, FaceBox};
use emotion_lens::EmotionPipeline;

const BOUNDARY: &str = "----emotionlensboundary";

struct FixedDetector(Option<FaceBox>);

impl FaceDetector for FixedDetector {
    fn detect(&self, _frame: &RgbImage) -> Result<Vec<DetectedFace>> {
        Ok(self
            .0
            .map(|bbox| DetectedFace {
                bbox,
                confidence: 0.9,
            })
            .into_iter()
            .collect())
    }
}

struct AlwaysSad;

impl EmotionClassifier for AlwaysSad {
    fn classify(&self, _input: &[f32]) -> Result<Vec<f32>> {
        Ok(vec![0.05, 0.05, 0.05, 0.05, 0.1, 0.65, 0.05])
    }
}

fn app(root: &Path, face: Option<FaceBox>) -> axum::Router {
    let state = AppState {
        store: ImageStore::new(root.join("uploads")).unwrap(),
        pipeline: Arc::new(EmotionPipeline::new(
            Arc::new(FixedDetector(face)),
            Arc::new(AlwaysSad),
            Annotator::with_font(&AnnotationConfig::default(), None),
            ReportWriter::new(root, ReportConfig::default()).unwrap(),
        )),
    };
    router(state, root, 16 * 1024 * 1024)
}

fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 64, Rgb([120, 120, 120]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn multipart_file(filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(
        format!(
            "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"webcam_image\"\r\n\r\n\r\n--{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );
    body
}

fn post_multipart(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn post_form(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn get_renders_empty_form() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), None)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("enctype=\"multipart/form-data\""));
    assert!(!html.contains("class=\"error\""));
}

#[tokio::test]
async fn post_without_image_reports_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), None)
        .oneshot(post_form(String::new()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No image provided"));
    assert_eq!(std::fs::read_dir(dir.path().join("uploads")).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_with_empty_filename_counts_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), Some(FaceBox::new(8, 8, 40, 40)))
        .oneshot(post_multipart(multipart_file("", &png_bytes())))
        .await
        .unwrap();

    assert!(body_text(response).await.contains("No image provided"));
}

#[tokio::test]
async fn upload_without_face_reports_no_face() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), None)
        .oneshot(post_multipart(multipart_file("nobody.png", &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No face detected"));
    assert!(dir.path().join("uploads/nobody.png").exists());
}

#[tokio::test]
async fn upload_with_face_renders_result() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), Some(FaceBox::new(8, 20, 40, 40)))
        .oneshot(post_multipart(multipart_file("me.png", &png_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("/static/uploads/me.png"));
    assert!(html.contains("65.00%"));
    assert!(html.contains("Tough times"));
    assert!(html.contains("Talk to someone you trust."));
    assert!(html.contains("#BBDEFB"));
    assert!(html.contains("/static/session_report_"));
}

#[tokio::test]
async fn result_links_resolve_for_reserved_filenames() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path(), Some(FaceBox::new(8, 20, 40, 40)));
    let response = app
        .clone()
        .oneshot(post_multipart(multipart_file("a#b.png", &png_bytes())))
        .await
        .unwrap();

    let html = body_text(response).await;
    assert!(html.contains("/static/uploads/a%23b.png"));

    let image = app
        .oneshot(
            Request::builder()
                .uri("/static/uploads/a%23b.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(image.status(), StatusCode::OK);
}

#[tokio::test]
async fn webcam_capture_is_accepted_as_form_field() {
    let dir = tempfile::tempdir().unwrap();
    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes()));
    let body = format!("webcam_image={}", urlencode(&data_url));

    let response = app(dir.path(), Some(FaceBox::new(8, 20, 40, 40)))
        .oneshot(post_form(body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("/static/uploads/webcam_"));
}

#[tokio::test]
async fn malformed_webcam_payload_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), None)
        .oneshot(post_form("webcam_image=garbage-without-comma".to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

fn urlencode(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}
