use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No image provided")]
    NoImage,

    #[error("No face detected")]
    NoFace,

    #[error("malformed webcam payload: {0}")]
    MalformedPayload(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("face region {width}x{height} at ({x}, {y}) lies outside the image")]
    EmptyFaceRegion { x: u32, y: u32, width: u32, height: u32 },

    #[error("model failure: {0:#}")]
    Model(#[from] anyhow::Error),

    #[error("failed to write report: {0}")]
    Report(String),
}

impl PipelineError {
    /// Message shown on the form for the early exits. `None` means the
    /// error is a request failure rather than a user-facing outcome.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            PipelineError::NoImage => Some("No image provided"),
            PipelineError::NoFace => Some("No face detected"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
