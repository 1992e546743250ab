//! TrueType/OpenType faces rasterized with ab_glyph.
//!
//! Font sizes follow CSS semantics: `font_size` is the em size in pixels,
//! so the ab_glyph scale is derived from units-per-em rather than used as a
//! raw pixel height.

use ab_glyph::{Font, FontArc, PxScale, Rect, ScaleFont, point};
use std::path::Path;

use super::Synthesis;
use crate::error::MidiatorError;
use crate::render::mask::Mask;

/// An outline font loaded from a font file.
#[derive(Clone)]
pub struct TtfFace {
    font: FontArc,
    name: String,
}

impl std::fmt::Debug for TtfFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtfFace").field("name", &self.name).finish()
    }
}

impl TtfFace {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, MidiatorError> {
        let name = name.into();
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| MidiatorError::Font(format!("Invalid font data for {}: {}", name, e)))?;
        Ok(Self { font, name })
    }

    pub fn load(path: &Path) -> Result<Self, MidiatorError> {
        let bytes = std::fs::read(path).map_err(|e| {
            MidiatorError::Font(format!("Failed to read font {}: {}", path.display(), e))
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// ab_glyph scale for a CSS pixel font size.
    fn scale(&self, font_size: f32) -> PxScale {
        let px = match self.font.units_per_em() {
            Some(upem) if upem > 0.0 => font_size * self.font.height_unscaled() / upem,
            _ => font_size,
        };
        PxScale::from(px)
    }

    pub fn ascent(&self, font_size: f32) -> f32 {
        self.font.as_scaled(self.scale(font_size)).ascent()
    }

    /// Distance below the baseline (positive).
    pub fn descent(&self, font_size: f32) -> f32 {
        -self.font.as_scaled(self.scale(font_size)).descent()
    }

    pub fn line_gap(&self, font_size: f32) -> f32 {
        self.font.as_scaled(self.scale(font_size)).line_gap()
    }

    /// Sum of horizontal advances (no kerning).
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.scale(font_size));
        text.chars()
            .map(|ch| scaled.h_advance(self.font.glyph_id(super::normalize_char(ch))))
            .sum()
    }

    /// Rasterize one line of text with its baseline at `baseline_y`.
    pub fn draw(
        &self,
        text: &str,
        font_size: f32,
        x: f32,
        baseline_y: f32,
        synthesis: Synthesis,
        mask: &mut Mask,
    ) {
        let scale = self.scale(font_size);
        let scaled = self.font.as_scaled(scale);
        let mut caret_x = x;

        for ch in text.chars() {
            let glyph_id = self.font.glyph_id(super::normalize_char(ch));
            let glyph = glyph_id.with_scale_and_position(scale, point(caret_x, baseline_y));

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                if !overlaps(mask, &bounds, baseline_y, font_size, synthesis) {
                    caret_x += scaled.h_advance(glyph_id);
                    continue;
                }
                outlined.draw(|px, py, coverage| {
                    let gx = px as i32 + bounds.min.x as i32;
                    let gy = py as i32 + bounds.min.y as i32;
                    super::plot(mask, gx, gy, coverage, baseline_y, font_size, synthesis);
                });
            }

            caret_x += scaled.h_advance(glyph_id);
        }
    }
}

/// Whether any pixel of a glyph (after synthesis) can land in `mask`.
fn overlaps(
    mask: &Mask,
    bounds: &Rect,
    baseline_y: f32,
    font_size: f32,
    synthesis: Synthesis,
) -> bool {
    let top = bounds.min.y.floor() as i32;
    let bottom = bounds.max.y.ceil() as i32;
    let shifts = [
        super::oblique_shift(top, baseline_y, synthesis),
        super::oblique_shift(bottom, baseline_y, synthesis),
    ];
    let bold = if synthesis.bold {
        super::embolden_px(font_size)
    } else {
        0
    };
    let left = bounds.min.x.floor() as i64 + shifts[0].min(shifts[1]) as i64;
    let right = bounds.max.x.ceil() as i64 + shifts[0].max(shifts[1]) as i64 + bold as i64;

    let mask_right = mask.origin_x as i64 + mask.width as i64;
    let mask_bottom = mask.origin_y as i64 + mask.height as i64;
    right >= mask.origin_x as i64
        && left < mask_right
        && bottom as i64 >= mask.origin_y as i64
        && (top as i64) < mask_bottom
}
