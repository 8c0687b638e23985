//! Single-page PDF session report.
//!
//! Layout is expressed in PDF points on a US-letter page (612 x 792), origin
//! bottom-left, and converted to millimetres for `printpdf`.

use printpdf::image_crate::{self, DynamicImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfLayerReference, Point, Pt,
};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::ReportConfig;
use crate::error::{PipelineError, Result};
use crate::types::EmotionResult;

const PAGE_W: f32 = 612.0;
const PAGE_H: f32 = 792.0;
const IMAGE_BOX: f32 = 200.0;

/// Text that goes on the page, independent of when it was generated.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContent {
    pub title: String,
    /// Label/value pairs of the "Session Details" section.
    pub fields: Vec<(&'static str, String)>,
    pub footer: String,
}

impl ReportContent {
    pub fn new(cfg: &ReportConfig, result: &EmotionResult) -> Self {
        let e = result.emotion;
        Self {
            title: cfg.title.clone(),
            fields: vec![
                ("Detected Emotion:", format!("{} {}", e.label(), e.emoji())),
                ("Confidence Score:", format!("{:.2}%", result.confidence)),
                ("Quote:", e.quote().to_string()),
                ("Mental Health Tip:", e.tip().to_string()),
            ],
            footer: cfg.footer.clone(),
        }
    }
}

/// A written report file.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub filename: String,
    pub path: PathBuf,
}

enum EmbeddedImage {
    Loaded(DynamicImage),
    /// The annotated image could not be read back; the page says so instead.
    Unavailable,
}

impl EmbeddedImage {
    fn load(path: &Path) -> Self {
        match image_crate::open(path) {
            Ok(img) => EmbeddedImage::Loaded(DynamicImage::ImageRgb8(img.to_rgb8())),
            Err(e) => {
                warn!("Image not available for report ({}): {}", path.display(), e);
                EmbeddedImage::Unavailable
            }
        }
    }
}

pub struct ReportWriter {
    dir: PathBuf,
    config: ReportConfig,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>, config: ReportConfig) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, config })
    }

    pub fn content(&self, result: &EmotionResult) -> ReportContent {
        ReportContent::new(&self.config, result)
    }

    pub fn write(&self, result: &EmotionResult, image_path: &Path) -> Result<ReportDocument> {
        self.write_at(result, image_path, chrono::Utc::now().timestamp())
    }

    /// Names the file `<prefix><timestamp>.pdf`; an existing file with the
    /// same name is overwritten.
    pub fn write_at(
        &self,
        result: &EmotionResult,
        image_path: &Path,
        timestamp: i64,
    ) -> Result<ReportDocument> {
        let filename = format!("{}{}.pdf", self.config.file_prefix, timestamp);
        let path = self.dir.join(&filename);

        let content = self.content(result);
        render(&content, EmbeddedImage::load(image_path), &path)?;
        info!("Wrote report {}", filename);

        Ok(ReportDocument { filename, path })
    }
}

fn render(content: &ReportContent, image: EmbeddedImage, path: &Path) -> Result<()> {
    let (doc, page, layer) = PdfDocument::new(
        content.title.as_str(),
        Mm::from(Pt(PAGE_W)),
        Mm::from(Pt(PAGE_H)),
        "Report",
    );
    let layer = doc.get_page(page).get_layer(layer);

    let font = |f: BuiltinFont| doc.add_builtin_font(f).map_err(report_err);
    let regular = font(BuiltinFont::Helvetica)?;
    let bold = font(BuiltinFont::HelveticaBold)?;
    let italic = font(BuiltinFont::HelveticaOblique)?;

    // Title
    text_centered(&layer, &content.title, 20.0, PAGE_H - 50.0, &bold);

    // Form border
    stroke_rect(&layer, 40.0, 40.0, PAGE_W - 80.0, PAGE_H - 120.0);

    text(&layer, "Session Details", 12.0, 60.0, PAGE_H - 110.0, &bold);

    let rows = [150.0, 180.0, 210.0, 250.0];
    for (i, ((label, value), offset)) in content.fields.iter().zip(rows).enumerate() {
        let y = PAGE_H - offset;
        text(&layer, label, 11.0, 60.0, y, &regular);
        // Emotion and confidence are emphasised
        let value_font = if i < 2 { &bold } else { &regular };
        text(&layer, value, 11.0, 200.0, y, value_font);
    }

    text(&layer, "Analyzed Image:", 12.0, 60.0, PAGE_H - 310.0, &bold);
    match image {
        EmbeddedImage::Loaded(img) => {
            embed_image(&layer, &img, 60.0, PAGE_H - 550.0);
        }
        EmbeddedImage::Unavailable => {
            text(&layer, "Image not available", 11.0, 60.0, PAGE_H - 340.0, &regular);
        }
    }

    text_centered(&layer, &content.footer, 9.0, 60.0, &italic);

    let file = File::create(path)?;
    doc.save(&mut BufWriter::new(file)).map_err(report_err)?;
    Ok(())
}

fn report_err(e: printpdf::Error) -> PipelineError {
    PipelineError::Report(e.to_string())
}

fn mm(v: f32) -> Mm {
    Mm::from(Pt(v))
}

fn text(layer: &PdfLayerReference, s: &str, size: f32, x: f32, y: f32, font: &IndirectFontRef) {
    layer.use_text(s, size, mm(x), mm(y), font);
}

fn text_centered(layer: &PdfLayerReference, s: &str, size: f32, y: f32, font: &IndirectFontRef) {
    let x = (PAGE_W - approx_text_width(s, size)) / 2.0;
    text(layer, s, size, x.max(0.0), y, font);
}

/// Builtin fonts carry no metrics here, so estimate with Helvetica-like
/// per-glyph widths (in em).
fn approx_text_width(s: &str, size: f32) -> f32 {
    let em: f32 = s
        .chars()
        .map(|c| match c {
            ' ' | '.' | ',' | ':' | ';' | '|' | 'i' | 'l' | 'j' | '!' | '\'' => 0.28,
            'f' | 't' | 'r' | 'I' => 0.36,
            'm' | 'w' | 'M' | 'W' => 0.83,
            c if c.is_ascii_uppercase() => 0.67,
            _ => 0.55,
        })
        .sum();
    em * size
}

fn stroke_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32) {
    let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
    layer.set_outline_thickness(1.0);
    layer.add_line(Line {
        points: corners
            .iter()
            .map(|&(px, py)| (Point::new(mm(px), mm(py)), false))
            .collect(),
        is_closed: true,
    });
}

/// Fits the image into the 200pt square at (x, y), aspect ratio preserved
/// and centred in the box.
fn embed_image(layer: &PdfLayerReference, img: &DynamicImage, x: f32, y: f32) {
    let (w, h) = (img.width() as f32, img.height() as f32);
    if w == 0.0 || h == 0.0 {
        return;
    }
    let scale = (IMAGE_BOX / w).min(IMAGE_BOX / h);
    let (draw_w, draw_h) = (w * scale, h * scale);

    // At 72 dpi one pixel is one point
    Image::from_dynamic_image(img).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(x + (IMAGE_BOX - draw_w) / 2.0)),
            translate_y: Some(mm(y + (IMAGE_BOX - draw_h) / 2.0)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
}
