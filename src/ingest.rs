use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::types::ImageAsset;

const WEBCAM_PREFIX: &str = "webcam_";

/// What a request handed us.
#[derive(Debug, Clone)]
pub enum ImageSubmission {
    /// Multipart upload, bytes stored verbatim.
    Upload { filename: String, bytes: Vec<u8> },
    /// `<header>,<base64-payload>` string from the webcam capture.
    Webcam { data_url: String },
}

impl ImageSubmission {
    /// Applies the request precedence: an upload with a non-empty filename,
    /// otherwise a non-empty webcam payload, otherwise nothing.
    pub fn select(
        upload: Option<(String, Vec<u8>)>,
        webcam: Option<String>,
    ) -> Option<ImageSubmission> {
        match upload {
            Some((filename, bytes)) if !filename.is_empty() => {
                Some(ImageSubmission::Upload { filename, bytes })
            }
            _ => webcam
                .filter(|d| !d.is_empty())
                .map(|data_url| ImageSubmission::Webcam { data_url }),
        }
    }
}

/// Writes submitted images into the uploads directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    upload_dir: PathBuf,
}

impl ImageStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Result<Self> {
        let upload_dir = upload_dir.into();
        fs::create_dir_all(&upload_dir)?;
        Ok(Self { upload_dir })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn ingest(&self, submission: Option<ImageSubmission>) -> Result<ImageAsset> {
        match submission {
            Some(ImageSubmission::Upload { filename, bytes }) => self.save_upload(&filename, &bytes),
            Some(ImageSubmission::Webcam { data_url }) => {
                self.save_webcam(&data_url, chrono::Utc::now().timestamp())
            }
            None => Err(PipelineError::NoImage),
        }
    }

    /// Same-named uploads overwrite each other.
    fn save_upload(&self, filename: &str, bytes: &[u8]) -> Result<ImageAsset> {
        let filename = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or(PipelineError::NoImage)?
            .to_string();

        let path = self.upload_dir.join(&filename);
        fs::write(&path, bytes)?;
        info!("Stored upload {} ({} bytes)", filename, bytes.len());

        Ok(ImageAsset { filename, path })
    }

    /// Decodes the capture and re-encodes it as JPEG under a
    /// second-granularity name; two captures in the same second collide.
    pub fn save_webcam(&self, data_url: &str, timestamp: i64) -> Result<ImageAsset> {
        let bytes = decode_data_url(data_url)?;
        let img = image::load_from_memory(&bytes)?;

        let filename = format!("{}{}.jpg", WEBCAM_PREFIX, timestamp);
        let path = self.upload_dir.join(&filename);
        img.to_rgb8().save_with_format(&path, ImageFormat::Jpeg)?;
        info!(
            "Stored webcam capture {} ({}x{})",
            filename,
            img.width(),
            img.height()
        );

        Ok(ImageAsset { filename, path })
    }
}

/// Strips everything up to the first comma and base64-decodes the rest.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| PipelineError::MalformedPayload("missing ',' separator".to_string()))?;
    debug!("Webcam payload header: {}", header);

    STANDARD
        .decode(payload.trim())
        .map_err(|e| PipelineError::MalformedPayload(e.to_string()))
}
