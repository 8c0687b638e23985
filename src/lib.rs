//! Face emotion analysis service: ingest an image, find the largest face,
//! classify its emotion, annotate the image and write a PDF session report.

pub mod args;
pub mod config;
pub mod detector;
pub mod emotion;
pub mod error;
pub mod font;
pub mod inference;
pub mod ingest;
pub mod overlay;
pub mod page;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod ttf;
pub mod types;

pub use emotion::Emotion;
pub use error::PipelineError;
pub use pipeline::{AnalysisOutcome, EmotionPipeline};
