//! # Field Compositor
//!
//! Draws every field of one record onto a surface that already holds the
//! background. Fields are drawn in record key order, so later fields paint
//! over earlier ones.
//!
//! A field is skipped when it has no position, is hidden, has no style, or
//! its value is empty. Values that look like markup go through the markup
//! renderer; everything else is wrapped and drawn as plain text.
//!
//! Nothing here returns an error: a field that cannot be drawn is logged and
//! left out, and the rest of the record is still drawn.

use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::font::FontBook;
use crate::layout;
use crate::markup::{self, InlineMarkupRenderer, MarkupRenderer, OffscreenStage};
use crate::model::{FieldLayout, FieldPosition, Record};
use crate::render::paint;
use crate::style::{self, ResolvedStyle};

/// A field box in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelBox {
    /// Convert a percentage position against the surface dimensions.
    pub fn from_percent(position: &FieldPosition, surface_width: u32, surface_height: u32) -> Self {
        let (w, h) = (surface_width as f32, surface_height as f32);
        Self {
            x: position.x / 100.0 * w,
            y: position.y / 100.0 * h,
            width: position.width / 100.0 * w,
            height: position.height / 100.0 * h,
        }
    }
}

/// How a field value gets drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRenderer {
    Plain,
    Markup,
}

impl FieldRenderer {
    pub fn select(value: &str) -> Self {
        if markup::looks_like_markup(value) {
            FieldRenderer::Markup
        } else {
            FieldRenderer::Plain
        }
    }
}

#[derive(Clone)]
pub struct FieldCompositor {
    fonts: Arc<FontBook>,
    markup: Arc<dyn MarkupRenderer>,
    stage: OffscreenStage,
}

impl std::fmt::Debug for FieldCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCompositor")
            .field("fonts", &self.fonts)
            .field("markup", &self.markup.name())
            .field("stage", &self.stage)
            .finish()
    }
}

impl FieldCompositor {
    /// Compositor using the built-in inline markup renderer.
    pub fn new(fonts: Arc<FontBook>) -> Self {
        let markup = Arc::new(InlineMarkupRenderer::new(Arc::clone(&fonts)));
        Self {
            fonts,
            markup,
            stage: OffscreenStage::new(),
        }
    }

    pub fn with_markup_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.set_markup_renderer(renderer);
        self
    }

    pub fn set_markup_renderer(&mut self, renderer: Arc<dyn MarkupRenderer>) {
        self.markup = renderer;
    }

    pub fn fonts(&self) -> &Arc<FontBook> {
        &self.fonts
    }

    pub fn stage(&self) -> &OffscreenStage {
        &self.stage
    }

    /// Draw all fields of `record`. Returns how many fields were drawn.
    pub async fn composite(
        &self,
        surface: &mut RgbaImage,
        record: &Record,
        layout: &FieldLayout,
    ) -> usize {
        let (width, height) = surface.dimensions();
        let mut drawn = 0;

        for (name, value) in record.iter() {
            let Some(position) = layout.position(name) else {
                continue;
            };
            if !position.visible {
                continue;
            }
            let Some(field_style) = layout.style(name) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }

            let bx = PixelBox::from_percent(position, width, height);
            let resolved = style::resolve(field_style);
            let renderer = FieldRenderer::select(value);
            tracing::debug!(field = name, ?renderer, "compositing field");

            let ok = match renderer {
                FieldRenderer::Plain => self.draw_plain(surface, value, bx, &resolved),
                FieldRenderer::Markup => self.draw_markup(surface, value, bx, &resolved).await,
            };
            if ok {
                drawn += 1;
            } else {
                tracing::debug!(field = name, "field left out");
            }
        }
        drawn
    }

    fn draw_plain(&self, surface: &mut RgbaImage, value: &str, bx: PixelBox, style: &ResolvedStyle) -> bool {
        let face = self.fonts.resolve(&style.font_spec());
        let lines = layout::wrap(value, &face, style.font_size, bx.width, bx.height);
        if lines.is_empty() {
            return false;
        }
        paint::paint_text_lines(surface, &face, &lines, bx.x, bx.y, style);
        true
    }

    async fn draw_markup(
        &self,
        surface: &mut RgbaImage,
        value: &str,
        bx: PixelBox,
        style: &ResolvedStyle,
    ) -> bool {
        let box_w = bx.width.round().max(0.0) as u32;
        let box_h = bx.height.round().max(0.0) as u32;

        let Some(mut bitmap) = markup::render_markup_to_bitmap(
            self.markup.as_ref(),
            &self.stage,
            value,
            box_w,
            box_h,
            style,
        )
        .await
        else {
            return false;
        };

        if bitmap.dimensions() != (box_w, box_h) {
            bitmap = imageops::resize(&bitmap, box_w, box_h, FilterType::Triangle);
        }
        paint::paint_bitmap(surface, &bitmap, bx.x.round() as i64, bx.y.round() as i64);
        true
    }
}
