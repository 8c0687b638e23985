use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

use crate::config::{parse_hex, AnnotationConfig};
use crate::error::Result;
use crate::font;
use crate::ttf::FontRenderer;
use crate::types::{EmotionResult, FaceBox};

/// Bitmap fallback scale for roughly the same cap height as the TTF caption.
const BITMAP_SCALE_DIVISOR: f32 = 7.0;

/// Draws the face box and caption onto the original image.
pub struct Annotator {
    color: Rgb<u8>,
    stroke_width: u32,
    font_size_px: f32,
    caption_offset_px: i32,
    font: Option<FontRenderer>,
}

impl Annotator {
    pub fn new(cfg: &AnnotationConfig) -> Self {
        Self::with_font(cfg, FontRenderer::try_load(&cfg.font_family))
    }

    pub fn with_font(cfg: &AnnotationConfig, font: Option<FontRenderer>) -> Self {
        let (r, g, b) = parse_hex(&cfg.box_color_hex);
        Self {
            color: Rgb([r, g, b]),
            stroke_width: cfg.stroke_width.max(1),
            font_size_px: cfg.font_size_px,
            caption_offset_px: cfg.caption_offset_px,
            font,
        }
    }

    /// Box outline plus `"<emoji> <label> (<confidence>%)"` with its baseline
    /// `caption_offset_px` above the box.
    pub fn annotate(&self, img: &mut RgbImage, bbox: FaceBox, result: &EmotionResult) {
        self.draw_box(img, bbox);

        let caption = result.caption();
        let baseline = bbox.y - self.caption_offset_px;
        match &self.font {
            Some(fr) => fr.draw_text(img, bbox.x, baseline, &caption, self.color, self.font_size_px),
            None => {
                let scale = ((self.font_size_px / BITMAP_SCALE_DIVISOR).round() as i32).max(1);
                font::draw_text_line(img, bbox.x, baseline, &caption, self.color, scale);
            }
        }
    }

    /// Stroke grows inwards from the box edge, one ring per pixel.
    fn draw_box(&self, img: &mut RgbImage, bbox: FaceBox) {
        for i in 0..self.stroke_width as i32 {
            let w = bbox.width - 2 * i;
            let h = bbox.height - 2 * i;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(bbox.x + i, bbox.y + i).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(img, rect, self.color);
        }
    }

    /// Annotates in place and overwrites `path`, keeping the file's format.
    pub fn annotate_file(
        &self,
        img: &mut RgbImage,
        format: ImageFormat,
        path: &Path,
        bbox: FaceBox,
        result: &EmotionResult,
    ) -> Result<()> {
        self.annotate(img, bbox, result);
        img.save_with_format(path, format)?;
        Ok(())
    }
}
