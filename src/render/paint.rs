//! Painting coverage masks onto RGBA surfaces.
//!
//! Surfaces are straight-alpha `image::RgbaImage`s. Painting uses canvas
//! source-over compositing, and pixels with zero coverage are never touched,
//! so drawing nothing leaves a surface bit-identical.

use image::{Rgba as Pixel, RgbaImage};

use super::mask::{Mask, effect_padding};
use crate::font::{ResolvedFace, TextMeasure};
use crate::layout;
use crate::style::{ResolvedStyle, Rgba, Shadow, Stroke};

/// Source-over blend of `color` at `alpha` (0..1) onto one pixel.
#[inline]
pub fn blend_over(dst: &mut Pixel<u8>, color: Rgba, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let sa = alpha.min(1.0);
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return;
    }

    let src = [color.r, color.g, color.b];
    for c in 0..3 {
        let s = src[c] as f32;
        let d = dst[c] as f32;
        dst[c] = ((s * sa + d * da * (1.0 - sa)) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Paint `mask` in `color`, shifted by `(dx, dy)`.
pub fn paint_mask(surface: &mut RgbaImage, mask: &Mask, dx: i32, dy: i32, color: Rgba) {
    if color.a == 0 {
        return;
    }
    let color_alpha = color.a as f32 / 255.0;
    let (sw, sh) = (surface.width() as i64, surface.height() as i64);

    for my in 0..mask.height {
        let y = mask.origin_y as i64 + my as i64 + dy as i64;
        if y < 0 || y >= sh {
            continue;
        }
        let row = &mask.data[my * mask.width..(my + 1) * mask.width];
        for (mx, &coverage) in row.iter().enumerate() {
            if coverage <= 0.0 {
                continue;
            }
            let x = mask.origin_x as i64 + mx as i64 + dx as i64;
            if x < 0 || x >= sw {
                continue;
            }
            blend_over(
                surface.get_pixel_mut(x as u32, y as u32),
                color,
                coverage * color_alpha,
            );
        }
    }
}

/// Composite a straight-alpha bitmap with its top-left corner at `(x, y)`.
pub fn paint_bitmap(surface: &mut RgbaImage, bitmap: &RgbaImage, x: i64, y: i64) {
    let (sw, sh) = (surface.width() as i64, surface.height() as i64);
    for (bx, by, px) in bitmap.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        let (tx, ty) = (x + bx as i64, y + by as i64);
        if tx < 0 || ty < 0 || tx >= sw || ty >= sh {
            continue;
        }
        blend_over(
            surface.get_pixel_mut(tx as u32, ty as u32),
            Rgba::rgb(px[0], px[1], px[2]),
            px[3] as f32 / 255.0,
        );
    }
}

/// Paint a blurred drop shadow of `silhouette`.
pub fn paint_shadow(surface: &mut RgbaImage, silhouette: &Mask, shadow: Shadow) {
    let blurred = silhouette.blur(shadow.blur);
    paint_mask(
        surface,
        &blurred,
        shadow.offset_x.round() as i32,
        shadow.offset_y.round() as i32,
        shadow.color,
    );
}

/// Paint a filled glyph mask with optional stroke and shadow.
///
/// Order is shadow, then stroke, then fill, so the fill always sits cleanly
/// on top of its outline.
pub fn paint_text_mask(
    surface: &mut RgbaImage,
    fill: &Mask,
    color: Rgba,
    stroke: Option<Stroke>,
    shadow: Option<Shadow>,
) {
    let outline = stroke.map(|s| fill.dilate(s.width / 2.0));

    if let Some(shadow) = shadow {
        let silhouette = match &outline {
            Some(outline) => outline.union(fill),
            None => fill.clone(),
        };
        paint_shadow(surface, &silhouette, shadow);
    }
    if let (Some(outline), Some(stroke)) = (&outline, stroke) {
        paint_mask(surface, outline, 0, 0, stroke.color);
    }
    paint_mask(surface, fill, 0, 0, color);
}

/// Draw wrapped plain-text lines left aligned from `(x, y)`.
///
/// Line `i` has the top of its em box at `y + i * font_size * 1.2`.
pub fn paint_text_lines(
    surface: &mut RgbaImage,
    face: &ResolvedFace,
    lines: &[String],
    x: f32,
    y: f32,
    style: &ResolvedStyle,
) {
    if lines.is_empty() {
        return;
    }

    let size = style.font_size;
    let line_height = layout::line_height(size);
    let stroke = style.stroke();
    let shadow = style.shadow();

    let widest = lines
        .iter()
        .map(|l| face.measure(l, size))
        .fold(0.0f32, f32::max);
    // Coverage further out than the surface is wide never reaches a pixel.
    let reach = surface.width().max(surface.height()).min(i32::MAX as u32) as i32;
    let pad = (effect_padding(stroke.map(|s| s.width), shadow.map(|s| s.blur))
        .saturating_add(size.ceil() as i32 / 4))
    .min(reach);
    let origin_x = x.floor() as i32 - pad;
    let origin_y = y.floor() as i32 - pad;
    let width = widest.ceil() as i32 + 2 * pad;
    let height = (lines.len() as f32 * line_height + size).ceil() as i32 + 2 * pad;
    let mut fill = Mask::new(origin_x, origin_y, width.max(0) as usize, height.max(0) as usize);

    let ascent = face.face.ascent(size);
    for (i, line) in lines.iter().enumerate() {
        let top = y + i as f32 * line_height;
        face.draw(line, size, x, top + ascent, &mut fill);
    }

    paint_text_mask(surface, &fill, style.color, stroke, shadow);
}
