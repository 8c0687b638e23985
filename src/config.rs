use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub detector: DetectorConfig,
    pub annotation: AnnotationConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Request body cap; photos and webcam data URLs exceed axum's 2 MiB default.
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Content root. Uploads go to `<static_dir>/uploads`, reports to the root itself.
    pub static_dir: PathBuf,
    pub detector_model: PathBuf,
    pub classifier_model: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub score_threshold: f32,
    pub iou_threshold: f32,
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub box_color_hex: String, // e.g. "#00FF00"
    pub stroke_width: u32,
    pub font_family: String, // e.g. "DejaVuSans", "Arial"
    pub font_size_px: f32,
    pub caption_offset_px: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub file_prefix: String,
    pub title: String,
    pub footer: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("static"),
            detector_model: PathBuf::from("models/face_detection.onnx"),
            classifier_model: PathBuf::from("models/emotion_classifier.onnx"),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.7,
            iou_threshold: 0.3,
            intra_threads: 4,
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            box_color_hex: "#00FF00".to_string(),
            stroke_width: 2,
            font_family: "DejaVuSans".to_string(),
            font_size_px: 28.0,
            caption_offset_px: 10,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file_prefix: "session_report_".to_string(),
            title: "Facial Emotion Detection Report".to_string(),
            footer: "AI Emotion Detection System | Automatically generated session report"
                .to_string(),
        }
    }
}

impl PathsConfig {
    pub fn upload_dir(&self) -> PathBuf {
        self.static_dir.join("uploads")
    }

    pub fn report_dir(&self) -> PathBuf {
        self.static_dir.clone()
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config.json";

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "Configuration file not found. Creating default at {}",
                path.display()
            );
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        // Missing fields fall back to Default thanks to #[serde(default)]
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());

        // Save back so new fields show up in the file
        config.save(path)?;

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

/// Parses `#RRGGBB`, falling back to green for anything else.
pub fn parse_hex(hex: &str) -> (u8, u8, u8) {
    if hex.len() == 7 && hex.is_ascii() && hex.starts_with('#') {
        let r = u8::from_str_radix(&hex[1..3], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[3..5], 16).unwrap_or(255);
        let b = u8::from_str_radix(&hex[5..7], 16).unwrap_or(0);
        (r, g, b)
    } else {
        (0, 255, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0000"), (255, 0, 0));
        assert_eq!(parse_hex("#00FF00"), (0, 255, 0));
        assert_eq!(parse_hex("#0000FF"), (0, 0, 255));
        assert_eq!(parse_hex("#FFFFFF"), (255, 255, 255));
        assert_eq!(parse_hex("invalid"), (0, 255, 0)); // Fallback
        assert_eq!(parse_hex("#a\u{e9}bbb"), (0, 255, 0));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{ "server": { "bind_addr": "0.0.0.0:8080" } }"#).unwrap();
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.annotation.stroke_width, 2);
        assert_eq!(cfg.paths.upload_dir(), PathBuf::from("static/uploads"));
        assert_eq!(cfg.report.file_prefix, "session_report_");
    }

    #[test]
    fn test_load_writes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = AppConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.detector.score_threshold, 0.7);

        let reloaded = AppConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.bind_addr, cfg.server.bind_addr);
    }

    #[test]
    fn test_malformed_file_is_an_error_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let broken = r#"{ "paths": { "detector_model": "/srv/models/det.onnx", } }"#;
        fs::write(&path, broken).unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }
}
