//! A tiny 3x5 bitmap font, used for captions when no TrueType font is
//! available. Letters render in upper case; unknown glyphs become a block.

use image::{Rgb, RgbImage};

const GLYPH_W: i32 = 3;
const GLYPH_H: i32 = 5;

/// Draws `text` so the bottom of the glyphs sits on `baseline_y`.
pub fn draw_text_line(
    img: &mut RgbImage,
    x: i32,
    baseline_y: i32,
    text: &str,
    color: Rgb<u8>,
    scale: i32,
) {
    let top = baseline_y - GLYPH_H * scale;
    let mut cx = x;
    for c in text.chars() {
        draw_char(img, cx, top, c, color, scale);
        cx += (GLYPH_W * scale) + scale; // 3 width + 1 spacing, scaled
    }
}

fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
        '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
        '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
        '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
        '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
        '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
        '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
        '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
        '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
        '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
        ' ' => [0x0, 0x0, 0x0, 0x0, 0x0],
        '.' => [0x0, 0x0, 0x0, 0x0, 0x2],
        '%' => [0x5, 0x1, 0x2, 0x4, 0x5],
        '(' => [0x2, 0x4, 0x4, 0x4, 0x2],
        ')' => [0x2, 0x1, 0x1, 0x1, 0x2],
        'A' => [0x2, 0x5, 0x7, 0x5, 0x5],
        'D' => [0x6, 0x5, 0x5, 0x5, 0x6],
        'E' => [0x7, 0x4, 0x6, 0x4, 0x7],
        'F' => [0x7, 0x4, 0x6, 0x4, 0x4],
        'G' => [0x7, 0x4, 0x5, 0x5, 0x7],
        'H' => [0x5, 0x5, 0x7, 0x5, 0x5],
        'I' => [0x7, 0x2, 0x2, 0x2, 0x7],
        'L' => [0x4, 0x4, 0x4, 0x4, 0x7],
        'N' => [0x6, 0x5, 0x5, 0x5, 0x5],
        'P' => [0x7, 0x5, 0x7, 0x4, 0x4],
        'R' => [0x6, 0x5, 0x6, 0x5, 0x5],
        'S' => [0x3, 0x4, 0x2, 0x1, 0x6],
        'T' => [0x7, 0x2, 0x2, 0x2, 0x2],
        'U' => [0x5, 0x5, 0x5, 0x5, 0x7],
        'Y' => [0x5, 0x5, 0x2, 0x2, 0x2],
        _ => [0x7, 0x7, 0x7, 0x7, 0x7],
    }
}

fn draw_char(img: &mut RgbImage, x: i32, y: i32, c: char, color: Rgb<u8>, scale: i32) {
    let (width, height) = (img.width() as i32, img.height() as i32);

    for (row, bits) in glyph(c).iter().enumerate() {
        for col in 0..GLYPH_W {
            // Column 0 is bit 2
            if (bits >> (2 - col)) & 1 == 1 {
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = x + col * scale + dx;
                        let py = y + row as i32 * scale + dy;
                        if px >= 0 && py >= 0 && px < width && py < height {
                            img.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_sits_on_baseline() {
        let mut img = RgbImage::new(40, 20);
        let green = Rgb([0, 255, 0]);
        draw_text_line(&mut img, 2, 12, "1", green, 2);

        // Glyph occupies rows 2..12
        let lit: Vec<u32> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == green)
            .map(|(_, y, _)| y)
            .collect();
        assert!(!lit.is_empty());
        assert!(lit.iter().all(|&y| (2..12).contains(&y)));
    }

    #[test]
    fn test_drawing_off_image_does_not_panic() {
        let mut img = RgbImage::new(10, 10);
        draw_text_line(&mut img, -20, -3, "happy (99.00%)", Rgb([0, 255, 0]), 3);
        draw_text_line(&mut img, 8, 30, "sad", Rgb([0, 255, 0]), 3);
    }
}
