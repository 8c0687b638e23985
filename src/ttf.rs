use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct FontRenderer {
    font: Font<'static>,
}

impl FontRenderer {
    pub fn try_load(family: &str) -> Option<Self> {
        // Family is like "DejaVuSans", "Arial"; filenames are "<family>.ttf"
        let paths = [
            format!("/usr/share/fonts/truetype/dejavu/{}.ttf", family),
            format!("/usr/share/fonts/truetype/{}.ttf", family),
            format!("/usr/share/fonts/TTF/{}.ttf", family),
            format!("/Library/Fonts/{}.ttf", family),
            format!("/System/Library/Fonts/{}.ttf", family),
            format!("/System/Library/Fonts/Supplemental/{}.ttf", family),
            format!("C:\\Windows\\Fonts\\{}.ttf", family),
            // Check local dir
            format!("fonts/{}.ttf", family),
            format!("{}.ttf", family),
        ];

        for p in paths.iter() {
            if Path::new(p).exists() {
                if let Ok(data) = fs::read(p) {
                    if let Some(font) = Font::try_from_vec(data) {
                        info!("Loaded caption font from {}", p);
                        return Some(Self { font });
                    }
                }
            }
        }

        warn!(
            "Could not find font family '{}'. Falling back to bitmap captions.",
            family
        );
        None
    }

    /// Draws `text` with its baseline at `baseline_y`. Pixels outside the
    /// image are skipped.
    pub fn draw_text(
        &self,
        img: &mut RgbImage,
        x: i32,
        baseline_y: i32,
        text: &str,
        color: Rgb<u8>,
        size_px: f32,
    ) {
        let scale = Scale::uniform(size_px);
        let start_point = point(x as f32, baseline_y as f32);
        let (width, height) = (img.width() as i32, img.height() as i32);

        for glyph in self.font.layout(text, scale, start_point) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    if v > 0.2 {
                        let px = bb.min.x + gx as i32;
                        let py = bb.min.y + gy as i32;
                        if px >= 0 && py >= 0 && px < width && py < height {
                            img.put_pixel(px as u32, py as u32, color);
                        }
                    }
                });
            }
        }
    }
}
