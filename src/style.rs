//! Style resolution: turn an optional-everything [`FieldStyle`] into concrete
//! paint parameters.
//!
//! Resolution never fails. Absent or malformed values fall back to the
//! defaults below, so a half-configured field still renders.
//!
//! | Property | Default |
//! |----------|---------|
//! | `fontFamily` | `Arial` |
//! | `fontSize` | `24` |
//! | `fontWeight` / `fontStyle` | `normal` |
//! | `color` | `#000000` |
//! | `textAlign` | `left` |
//! | `textShadow` | off (`#000000`, blur 4, offset 2/2) |
//! | `textStroke` | off (`#ffffff`, width 2) |
//! | `lineHeightMultiplier` | unset |

use serde::{Deserialize, Serialize};

use crate::model::FieldStyle;

pub const DEFAULT_FONT_FAMILY: &str = "Arial";
pub const DEFAULT_FONT_SIZE: f32 = 24.0;
pub const DEFAULT_COLOR: Rgba = Rgba::BLACK;
pub const DEFAULT_SHADOW_COLOR: Rgba = Rgba::BLACK;
pub const DEFAULT_SHADOW_BLUR: f32 = 4.0;
pub const DEFAULT_SHADOW_OFFSET: f32 = 2.0;
pub const DEFAULT_STROKE_COLOR: Rgba = Rgba::WHITE;
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

// ============================================================================
// COLOR
// ============================================================================

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS color: hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`),
    /// `rgb()`/`rgba()`, `transparent`, or a basic named color.
    pub fn parse(input: &str) -> Option<Rgba> {
        let s = input.trim().to_ascii_lowercase();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args);
        }
        named_color(&s)
    }

    /// CSS-style serialization (`#rrggbb` or `rgba(...)`).
    pub fn to_css(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({}, {}, {}, {:.3})",
                self.r,
                self.g,
                self.b,
                self.a as f32 / 255.0
            )
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let parts: Vec<&str> = args
        .split(|c| c == ',' || c == '/' || c == ' ')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }

    let channel = |p: &str| -> Option<u8> {
        let v = match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? * 2.55,
            None => p.parse::<f32>().ok()?,
        };
        v.is_finite().then(|| v.clamp(0.0, 255.0).round() as u8)
    };
    let alpha = |p: &str| -> Option<u8> {
        let v = match p.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok()? / 100.0,
            None => p.parse::<f32>().ok()?,
        };
        v.is_finite().then(|| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
    };

    let a = match parts.get(3) {
        Some(p) => alpha(p)?,
        None => 255,
    };
    Some(Rgba::rgba(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
        a,
    ))
}

fn named_color(name: &str) -> Option<Rgba> {
    let c = match name {
        "transparent" => Rgba::TRANSPARENT,
        "black" => Rgba::BLACK,
        "white" => Rgba::WHITE,
        "red" => Rgba::rgb(255, 0, 0),
        "green" => Rgba::rgb(0, 128, 0),
        "lime" => Rgba::rgb(0, 255, 0),
        "blue" => Rgba::rgb(0, 0, 255),
        "yellow" => Rgba::rgb(255, 255, 0),
        "cyan" | "aqua" => Rgba::rgb(0, 255, 255),
        "magenta" | "fuchsia" => Rgba::rgb(255, 0, 255),
        "gray" | "grey" => Rgba::rgb(128, 128, 128),
        "silver" => Rgba::rgb(192, 192, 192),
        "maroon" => Rgba::rgb(128, 0, 0),
        "olive" => Rgba::rgb(128, 128, 0),
        "navy" => Rgba::rgb(0, 0, 128),
        "purple" => Rgba::rgb(128, 0, 128),
        "teal" => Rgba::rgb(0, 128, 128),
        "orange" => Rgba::rgb(255, 165, 0),
        "pink" => Rgba::rgb(255, 192, 203),
        "brown" => Rgba::rgb(165, 42, 42),
        "gold" => Rgba::rgb(255, 215, 0),
        _ => return None,
    };
    Some(c)
}

// ============================================================================
// RESOLVED STYLE
// ============================================================================

/// Horizontal alignment inside a field box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// `justify`, `start` and unknown values resolve to left.
    pub fn parse(value: &str) -> TextAlign {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" => TextAlign::Center,
            "right" | "end" => TextAlign::Right,
            _ => TextAlign::Left,
        }
    }

    /// X offset of a line of `line_width` inside `box_width`.
    pub fn offset(self, box_width: f32, line_width: f32) -> f32 {
        let slack = (box_width - line_width).max(0.0);
        match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => slack / 2.0,
            TextAlign::Right => slack,
        }
    }
}

/// Drop shadow parameters (canvas semantics: blur is the `shadowBlur` value).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Shadow {
    /// Single composed shadow value, as a CSS `text-shadow`.
    pub fn to_css(self) -> String {
        format!(
            "{}px {}px {}px {}",
            self.offset_x,
            self.offset_y,
            self.blur,
            self.color.to_css()
        )
    }
}

/// Outline painted underneath the fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f32,
}

/// The font a field asks for: a family fallback list plus size and variant.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Family names in preference order (a CSS `font-family` list, unquoted).
    pub families: Vec<String>,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn new(family: &str, size: f32) -> Self {
        Self {
            families: parse_family_list(family),
            size,
            bold: false,
            italic: false,
        }
    }
}

/// Split a CSS `font-family` list into unquoted names.
pub fn parse_family_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Concrete paint parameters for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgba,
    pub text_align: TextAlign,
    pub text_shadow: bool,
    pub shadow_color: Rgba,
    pub shadow_blur: f32,
    pub shadow_offset_x: f32,
    pub shadow_offset_y: f32,
    pub text_stroke: bool,
    pub stroke_color: Rgba,
    pub stroke_width: f32,
    pub line_height_multiplier: Option<f32>,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        resolve(&FieldStyle::default())
    }
}

impl ResolvedStyle {
    pub fn font_spec(&self) -> FontSpec {
        let mut families = parse_family_list(&self.font_family);
        if families.is_empty() {
            families.push(DEFAULT_FONT_FAMILY.to_string());
        }
        FontSpec {
            families,
            size: self.font_size,
            bold: self.bold,
            italic: self.italic,
        }
    }

    pub fn shadow(&self) -> Option<Shadow> {
        self.text_shadow.then_some(Shadow {
            color: self.shadow_color,
            blur: self.shadow_blur,
            offset_x: self.shadow_offset_x,
            offset_y: self.shadow_offset_y,
        })
    }

    pub fn stroke(&self) -> Option<Stroke> {
        (self.text_stroke && self.stroke_width > 0.0).then_some(Stroke {
            color: self.stroke_color,
            width: self.stroke_width,
        })
    }

    /// Explicit line height for the markup path, if configured.
    pub fn explicit_line_height(&self) -> Option<f32> {
        self.line_height_multiplier.map(|m| m * self.font_size)
    }
}

pub(crate) fn is_bold_weight(weight: &str) -> bool {
    let w = weight.trim().to_ascii_lowercase();
    match w.as_str() {
        "bold" | "bolder" => true,
        _ => w.parse::<f32>().map(|n| n >= 600.0).unwrap_or(false),
    }
}

pub(crate) fn is_italic_style(style: &str) -> bool {
    let s = style.trim().to_ascii_lowercase();
    s == "italic" || s.starts_with("oblique")
}

fn positive(v: Option<f32>) -> Option<f32> {
    v.filter(|v| v.is_finite() && *v > 0.0)
}

fn non_negative(v: Option<f32>) -> Option<f32> {
    v.filter(|v| v.is_finite() && *v >= 0.0)
}

fn finite(v: Option<f32>) -> Option<f32> {
    v.filter(|v| v.is_finite())
}

fn color_or(value: Option<&str>, default: Rgba) -> Rgba {
    value.and_then(Rgba::parse).unwrap_or(default)
}

/// Resolve a field style to concrete paint parameters.
pub fn resolve(style: &FieldStyle) -> ResolvedStyle {
    let font_family = style
        .font_family
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_FONT_FAMILY)
        .to_string();

    ResolvedStyle {
        font_family,
        font_size: positive(style.font_size).unwrap_or(DEFAULT_FONT_SIZE),
        bold: style.font_weight.as_deref().is_some_and(is_bold_weight),
        italic: style.font_style.as_deref().is_some_and(is_italic_style),
        color: color_or(style.color.as_deref(), DEFAULT_COLOR),
        text_align: style
            .text_align
            .as_deref()
            .map(TextAlign::parse)
            .unwrap_or_default(),
        text_shadow: style.text_shadow.unwrap_or(false),
        shadow_color: color_or(style.shadow_color.as_deref(), DEFAULT_SHADOW_COLOR),
        shadow_blur: non_negative(style.shadow_blur).unwrap_or(DEFAULT_SHADOW_BLUR),
        shadow_offset_x: finite(style.shadow_offset_x).unwrap_or(DEFAULT_SHADOW_OFFSET),
        shadow_offset_y: finite(style.shadow_offset_y).unwrap_or(DEFAULT_SHADOW_OFFSET),
        text_stroke: style.text_stroke.unwrap_or(false),
        stroke_color: color_or(style.stroke_color.as_deref(), DEFAULT_STROKE_COLOR),
        stroke_width: non_negative(style.stroke_width).unwrap_or(DEFAULT_STROKE_WIDTH),
        line_height_multiplier: positive(style.line_height_multiplier),
    }
}
