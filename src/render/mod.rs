//! # Rendering Module
//!
//! Low-level raster primitives shared by the plain-text and markup paths.
//!
//! ## Modules
//!
//! - [`mask`]: Coverage masks with stroke dilation and shadow blur
//! - [`paint`]: Source-over painting of masks onto RGBA surfaces
//!
//! ## Usage Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use midiator::font::FontBook;
//! use midiator::render::paint;
//! use midiator::style::ResolvedStyle;
//!
//! let mut surface = RgbaImage::from_pixel(320, 80, Rgba([255, 255, 255, 255]));
//! let style = ResolvedStyle::default();
//! let face = FontBook::builtin().resolve(&style.font_spec());
//!
//! paint::paint_text_lines(&mut surface, &face, &["Hello".to_string()], 10.0, 10.0, &style);
//! ```

pub mod mask;
pub mod paint;
