//! # Markup Fallback Renderer
//!
//! Field values that contain HTML-like markup (`<b>Sale</b>`, `Tom &amp;
//! Jerry`) cannot go through the plain-text wrap path. They are rendered
//! into a transparent bitmap the size of the field box and composited on
//! top of the surface instead.
//!
//! Rendering goes through the [`MarkupRenderer`] trait so the rasterizer
//! can be swapped. [`render_markup_to_bitmap`] wraps any renderer: it
//! mounts a styled container on the [`OffscreenStage`], calls the renderer,
//! and turns every failure into `None` plus a warning. A markup field can
//! never fail a batch.
//!
//! Limitations: stroke is never applied to markup fields, and content that
//! does not fit the box is clipped rather than reflowed.

pub mod inline;
pub mod stage;

pub use inline::InlineMarkupRenderer;
pub use stage::{Container, ContainerGuard, ContainerStyle, OffscreenStage};

use async_trait::async_trait;
use image::RgbaImage;
use thiserror::Error;

use crate::style::ResolvedStyle;

/// Errors from a markup renderer. Contained by [`render_markup_to_bitmap`].
#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Markup has no drawable text")]
    Empty,

    #[error("Invalid container size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Markup render error: {0}")]
    Render(String),

    #[error("Markup task failed: {0}")]
    Task(String),
}

/// One markup render job.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupRequest {
    pub markup: String,
    pub width: u32,
    pub height: u32,
    pub style: ResolvedStyle,
}

/// Rasterizes markup into a container-sized RGBA bitmap.
///
/// The returned bitmap should match the container dimensions; callers
/// resize it to the box when it does not.
#[async_trait]
pub trait MarkupRenderer: Send + Sync {
    async fn render(
        &self,
        request: &MarkupRequest,
        container: &Container,
    ) -> Result<RgbaImage, MarkupError>;

    fn name(&self) -> &str {
        "markup"
    }
}

/// Heuristic markup detection: an HTML-like tag or an HTML entity.
///
/// A tag is `<` followed by a letter, `/` or `!` with a `>` somewhere after
/// it, so `a < b` stays plain text.
pub fn looks_like_markup(value: &str) -> bool {
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => {
                let starts_tag = bytes
                    .get(i + 1)
                    .is_some_and(|&c| c.is_ascii_alphabetic() || c == b'/' || c == b'!');
                if starts_tag && bytes[i + 1..].contains(&b'>') {
                    return true;
                }
            }
            b'&' => {
                if is_entity(&bytes[i + 1..]) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// `name;`, `#123;` or `#x1F;` at the start of `rest`.
fn is_entity(rest: &[u8]) -> bool {
    let Some(end) = rest.iter().take(32).position(|&c| c == b';') else {
        return false;
    };
    let body = &rest[..end];
    match body {
        [] => false,
        [b'#', b'x' | b'X', hex @ ..] => !hex.is_empty() && hex.iter().all(u8::is_ascii_hexdigit),
        [b'#', digits @ ..] => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
        name => name[0].is_ascii_alphabetic() && name.iter().all(u8::is_ascii_alphanumeric),
    }
}

/// Render markup into a `width` x `height` bitmap, or `None` on any failure.
///
/// The container is mounted for the duration of the call only.
pub async fn render_markup_to_bitmap(
    renderer: &dyn MarkupRenderer,
    stage: &OffscreenStage,
    markup: &str,
    width: u32,
    height: u32,
    style: &ResolvedStyle,
) -> Option<RgbaImage> {
    if width == 0 || height == 0 {
        tracing::debug!(width, height, "skipping markup for empty box");
        return None;
    }

    let container = stage.mount(width, height, ContainerStyle::from_resolved(style));
    let request = MarkupRequest {
        markup: markup.to_string(),
        width,
        height,
        style: style.clone(),
    };

    match renderer.render(&request, &container).await {
        Ok(bitmap) => Some(bitmap),
        Err(e) => {
            tracing::warn!(renderer = renderer.name(), error = %e, "markup render failed");
            None
        }
    }
}
