//! Built-in bitmap face using the Spleen 12x24 font.
//!
//! Always available, so a batch still renders when no font file matches the
//! requested family. The face is monospaced: every character advances by
//! half the font size, which also makes its measurement exactly additive.

use spleen_font::{FONT_12X24, PSF2Font};

use super::Synthesis;
use crate::render::mask::Mask;

const CELL_WIDTH: usize = 12;
const CELL_HEIGHT: usize = 24;

/// Advance per character as a fraction of the font size.
pub const ADVANCE_RATIO: f32 = 0.5;
const ASCENT_RATIO: f32 = 0.8;
const DESCENT_RATIO: f32 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitmapFace;

impl BitmapFace {
    pub fn name(&self) -> &str {
        "spleen-12x24"
    }

    pub fn ascent(&self, font_size: f32) -> f32 {
        font_size * ASCENT_RATIO
    }

    pub fn descent(&self, font_size: f32) -> f32 {
        font_size * DESCENT_RATIO
    }

    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * ADVANCE_RATIO
    }

    /// Rasterize one line of text with its baseline at `baseline_y`.
    ///
    /// Glyph cells are scaled from 12x24 with nearest-neighbour sampling.
    pub fn draw(
        &self,
        text: &str,
        font_size: f32,
        x: f32,
        baseline_y: f32,
        synthesis: Synthesis,
        mask: &mut Mask,
    ) {
        let Ok(mut spleen) = PSF2Font::new(FONT_12X24) else {
            return;
        };

        let advance = font_size * ADVANCE_RATIO;
        let cell_w = advance.ceil().max(1.0) as usize;
        let cell_h = font_size.ceil().max(1.0) as usize;
        let top = (baseline_y - self.ascent(font_size)).round() as i32;

        for (i, ch) in text.chars().enumerate() {
            let ch = super::normalize_char(ch);
            if ch == ' ' {
                continue;
            }
            let cell_x = (x + i as f32 * advance).floor() as i32;

            let mut buf = [0u8; 4];
            let utf8 = ch.encode_utf8(&mut buf);
            let mut glyph = vec![0u8; CELL_WIDTH * CELL_HEIGHT];
            if let Some(spleen_glyph) = spleen.glyph_for_utf8(utf8.as_bytes()) {
                for (row_y, row) in spleen_glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        let idx = row_y * CELL_WIDTH + col_x;
                        if idx < glyph.len() {
                            glyph[idx] = if on { 1 } else { 0 };
                        }
                    }
                }
            } else {
                draw_box(&mut glyph, CELL_WIDTH, CELL_HEIGHT);
            }

            // Only the part of the scaled cell that can land in the mask.
            let emboldened = if synthesis.bold {
                super::embolden_px(font_size) as i64
            } else {
                0
            };
            let rows = span(
                mask.origin_y as i64 - top as i64,
                mask.origin_y as i64 + mask.height as i64 - top as i64,
                cell_h,
            );
            for dy in rows {
                let sy = dy * CELL_HEIGHT / cell_h;
                let shift = super::oblique_shift(top + dy as i32, baseline_y, synthesis) as i64;
                let left = cell_x as i64 + shift;
                let cols = span(
                    mask.origin_x as i64 - left - emboldened,
                    mask.origin_x as i64 + mask.width as i64 - left,
                    cell_w,
                );
                for dx in cols {
                    let sx = dx * CELL_WIDTH / cell_w;
                    if glyph[sy * CELL_WIDTH + sx] != 0 {
                        super::plot(
                            mask,
                            cell_x + dx as i32,
                            top + dy as i32,
                            1.0,
                            baseline_y,
                            font_size,
                            synthesis,
                        );
                    }
                }
            }
        }
    }
}

/// Cell offsets in `[start, end)` clamped to `0..len`.
fn span(start: i64, end: i64, len: usize) -> std::ops::Range<usize> {
    let start = start.clamp(0, len as i64) as usize;
    let end = end.clamp(0, len as i64) as usize;
    start..end.max(start)
}

/// Draw a box outline for characters the font does not cover.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 2..width - 2 {
        glyph[4 * width + x] = 1;
        glyph[(height - 5) * width + x] = 1;
    }
    for y in 4..height - 4 {
        glyph[y * width + 2] = 1;
        glyph[y * width + width - 3] = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_is_additive() {
        let face = BitmapFace;
        assert_eq!(face.measure("abcd", 24.0), 48.0);
        assert_eq!(
            face.measure("ab cd", 20.0),
            face.measure("ab", 20.0) + face.measure(" ", 20.0) + face.measure("cd", 20.0)
        );
    }

    #[test]
    fn test_draw_marks_pixels_inside_cell() {
        let face = BitmapFace;
        let mut mask = Mask::new(0, 0, 40, 40);
        face.draw("A", 24.0, 0.0, 19.2, Synthesis::default(), &mut mask);
        assert!(!mask.is_blank());
        for y in 0..40 {
            for x in 12..40 {
                assert_eq!(mask.get(x, y), 0.0, "pixel {},{} outside the cell", x, y);
            }
        }
    }

    #[test]
    fn test_space_draws_nothing() {
        let face = BitmapFace;
        let mut mask = Mask::new(0, 0, 40, 40);
        face.draw("  ", 24.0, 0.0, 19.2, Synthesis::default(), &mut mask);
        assert!(mask.is_blank());
    }

    #[test]
    fn test_clipped_draw_matches_full_draw() {
        let face = BitmapFace;
        let synthesis = Synthesis {
            bold: true,
            oblique: true,
        };
        let mut full = Mask::new(-10, -10, 140, 80);
        face.draw("Wg", 48.0, 3.0, 40.0, synthesis, &mut full);

        let mut window = Mask::new(17, 9, 23, 31);
        face.draw("Wg", 48.0, 3.0, 40.0, synthesis, &mut window);
        assert!(!window.is_blank());
        for y in 9..40 {
            for x in 17..40 {
                assert_eq!(window.get(x, y), full.get(x, y), "pixel {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_huge_size_only_rasterizes_visible_rows() {
        let face = BitmapFace;
        let mut mask = Mask::new(0, 0, 50, 30);
        let start = std::time::Instant::now();
        face.draw("ab", 48_000.0, 0.0, 38_400.0, Synthesis::default(), &mut mask);
        assert!(
            start.elapsed() < std::time::Duration::from_secs(2),
            "took {:?}",
            start.elapsed()
        );
    }
}
