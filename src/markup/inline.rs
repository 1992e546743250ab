//! Built-in markup renderer for a small inline HTML subset.
//!
//! Markup is parsed with kuchiki and flattened into styled text runs, which
//! are greedy-wrapped inside the container (words never split; runs glued
//! together without whitespace wrap as one word), aligned, and rasterized
//! with the crate's own fonts. Output is a transparent bitmap exactly the
//! size of the container; anything past its bottom edge is clipped.
//!
//! Supported:
//!
//! | Markup | Effect |
//! |--------|--------|
//! | `b`, `strong` | bold |
//! | `i`, `em` | italic |
//! | `u` | underline |
//! | `s`, `strike`, `del` | line-through |
//! | `br` | line break |
//! | `p`, `div`, `li`, `h1`-`h6`, ... | block (breaks before and after) |
//! | `font color= face= size=` | color, family, size |
//! | `style="..."` | `color`, `font-weight`, `font-style`, `font-size`, `font-family`, `text-decoration` |
//!
//! `img`, `script` and `style` elements are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use kuchiki::traits::TendrilSink;
use kuchiki::{NodeData, NodeRef};

use super::{Container, ContainerStyle, MarkupError, MarkupRenderer, MarkupRequest};
use crate::font::{FontBook, ResolvedFace, TextMeasure};
use crate::render::mask::Mask;
use crate::render::paint;
use crate::style::{self, FontSpec, Rgba, parse_family_list};

/// Renders markup with the fonts of a [`FontBook`].
#[derive(Debug, Clone)]
pub struct InlineMarkupRenderer {
    fonts: Arc<FontBook>,
}

impl InlineMarkupRenderer {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self { fonts }
    }
}

impl Default for InlineMarkupRenderer {
    fn default() -> Self {
        Self::new(Arc::new(FontBook::builtin()))
    }
}

#[async_trait]
impl MarkupRenderer for InlineMarkupRenderer {
    async fn render(
        &self,
        request: &MarkupRequest,
        container: &Container,
    ) -> Result<RgbaImage, MarkupError> {
        let fonts = Arc::clone(&self.fonts);
        let markup = request.markup.clone();
        let (width, height) = (container.width, container.height);
        let style = container.style.clone();

        // kuchiki trees are not Send, so parsing happens on the blocking thread too.
        tokio::task::spawn_blocking(move || rasterize(&fonts, &markup, width, height, &style))
            .await
            .map_err(|e| MarkupError::Task(e.to_string()))?
    }

    fn name(&self) -> &str {
        "inline"
    }
}

// ============================================================================
// PARSING
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct RunStyle {
    families: Vec<String>,
    size: f32,
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    color: Rgba,
}

impl RunStyle {
    fn root(style: &ContainerStyle) -> Self {
        Self {
            families: parse_family_list(&style.font_family),
            size: style.font_size,
            bold: style.bold,
            italic: style.italic,
            underline: false,
            strike: false,
            color: style.color,
        }
    }

    fn font_spec(&self) -> FontSpec {
        FontSpec {
            families: self.families.clone(),
            size: self.size,
            bold: self.bold,
            italic: self.italic,
        }
    }

    /// Apply an inline `style` attribute.
    fn apply_css(&mut self, css: &str) {
        for decl in css.split(';') {
            let Some((property, value)) = decl.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match property.trim().to_ascii_lowercase().as_str() {
                "color" => {
                    if let Some(color) = Rgba::parse(value) {
                        self.color = color;
                    }
                }
                "font-weight" => self.bold = style::is_bold_weight(value),
                "font-style" => self.italic = style::is_italic_style(value),
                "font-size" => {
                    if let Some(px) = parse_length(value, self.size) {
                        self.size = px;
                    }
                }
                "font-family" => {
                    let families = parse_family_list(value);
                    if !families.is_empty() {
                        self.families = families;
                    }
                }
                "text-decoration" | "text-decoration-line" => {
                    let v = value.to_ascii_lowercase();
                    if v.contains("none") {
                        self.underline = false;
                        self.strike = false;
                    } else {
                        self.underline |= v.contains("underline");
                        self.strike |= v.contains("line-through");
                    }
                }
                _ => {}
            }
        }
    }
}

/// CSS length in pixels (`px`, `pt`, `em`, `rem`, `%`, or a bare number).
fn parse_length(value: &str, current: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(v.len());
    let (number, unit) = v.split_at(split);
    let n: f32 = number.parse().ok()?;
    let px = match unit.trim() {
        "" | "px" => n,
        "pt" => n * 4.0 / 3.0,
        "em" | "rem" => n * current,
        "%" => n * current / 100.0,
        _ => return None,
    };
    (px.is_finite() && px > 0.0).then_some(px)
}

/// Legacy `<font size=1..7>` in pixels.
fn font_size_attr(value: &str) -> Option<f32> {
    match value.trim() {
        "1" => Some(10.0),
        "2" => Some(13.0),
        "3" => Some(16.0),
        "4" => Some(18.0),
        "5" => Some(24.0),
        "6" => Some(32.0),
        "7" => Some(48.0),
        _ => None,
    }
}

fn heading_scale(tag: &str) -> Option<f32> {
    match tag {
        "h1" => Some(2.0),
        "h2" => Some(1.5),
        "h3" => Some(1.17),
        "h4" => Some(1.0),
        "h5" => Some(0.83),
        "h6" => Some(0.67),
        _ => None,
    }
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "li"
            | "ul"
            | "ol"
            | "blockquote"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
    )
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String, RunStyle),
    /// `<br>`: always ends the line, even an empty one.
    Break,
    /// Block boundary: ends the line only if it has content.
    BlockBreak,
}

fn parse(markup: &str, root: &RunStyle) -> Vec<Token> {
    let document = kuchiki::parse_html().one(markup);
    let body = match document.select_first("body") {
        Ok(body) => body.as_node().clone(),
        Err(()) => document.clone(),
    };
    let mut tokens = Vec::new();
    for child in body.children() {
        collect(&child, root, &mut tokens);
    }
    tokens
}

fn collect(node: &NodeRef, inherited: &RunStyle, out: &mut Vec<Token>) {
    match node.data() {
        NodeData::Text(text) => out.push(Token::Text(text.borrow().clone(), inherited.clone())),
        NodeData::Element(el) => {
            let tag = el.name.local.as_ref().to_ascii_lowercase();
            match tag.as_str() {
                "script" | "style" | "img" | "head" | "title" | "template" => return,
                "br" => {
                    out.push(Token::Break);
                    return;
                }
                _ => {}
            }

            let mut style = inherited.clone();
            match tag.as_str() {
                "b" | "strong" => style.bold = true,
                "i" | "em" => style.italic = true,
                "u" => style.underline = true,
                "s" | "strike" | "del" => style.strike = true,
                _ => {}
            }
            if let Some(scale) = heading_scale(&tag) {
                style.bold = true;
                style.size *= scale;
            }
            {
                let attrs = el.attributes.borrow();
                if tag == "font" {
                    if let Some(color) = attrs.get("color").and_then(Rgba::parse) {
                        style.color = color;
                    }
                    if let Some(face) = attrs.get("face") {
                        let families = parse_family_list(face);
                        if !families.is_empty() {
                            style.families = families;
                        }
                    }
                    if let Some(px) = attrs.get("size").and_then(font_size_attr) {
                        style.size = px;
                    }
                }
                if let Some(css) = attrs.get("style") {
                    style.apply_css(css);
                }
            }

            let block = is_block(&tag);
            if block {
                out.push(Token::BlockBreak);
            }
            for child in node.children() {
                collect(&child, &style, out);
            }
            if block {
                out.push(Token::BlockBreak);
            }
        }
        NodeData::Document(_) | NodeData::DocumentFragment => {
            for child in node.children() {
                collect(&child, inherited, out);
            }
        }
        _ => {}
    }
}

// ============================================================================
// LINE LAYOUT
// ============================================================================

#[derive(Debug, Clone)]
struct PlacedRun {
    text: String,
    style: RunStyle,
    face: ResolvedFace,
    x: f32,
    width: f32,
}

#[derive(Debug, Clone, Default)]
struct Line {
    runs: Vec<PlacedRun>,
    width: f32,
}

impl Line {
    fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

struct LineBuilder<'a> {
    fonts: &'a FontBook,
    max_width: f32,
    lines: Vec<Line>,
    current: Line,
    pending_space: Option<f32>,
    word: Vec<(String, RunStyle)>,
    has_text: bool,
}

impl<'a> LineBuilder<'a> {
    fn new(fonts: &'a FontBook, max_width: f32) -> Self {
        Self {
            fonts,
            max_width,
            lines: Vec::new(),
            current: Line::default(),
            pending_space: None,
            word: Vec::new(),
            has_text: false,
        }
    }

    fn text(&mut self, text: &str, style: &RunStyle) {
        for (i, part) in text.split(|c: char| c.is_ascii_whitespace()).enumerate() {
            if i > 0 {
                self.flush_word();
                let face = self.fonts.resolve(&style.font_spec());
                self.pending_space = Some(face.measure(" ", style.size));
            }
            if !part.is_empty() {
                self.word.push((part.to_string(), style.clone()));
            }
        }
    }

    /// Place the pending word, wrapping first if it would overflow.
    fn flush_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let runs: Vec<(String, RunStyle, ResolvedFace, f32)> = self
            .word
            .drain(..)
            .map(|(text, style)| {
                let face = self.fonts.resolve(&style.font_spec());
                let width = face.measure(&text, style.size);
                (text, style, face, width)
            })
            .collect();
        let word_width: f32 = runs.iter().map(|r| r.3).sum();

        let mut space = if self.current.is_empty() {
            0.0
        } else {
            self.pending_space.unwrap_or(0.0)
        };
        if !self.current.is_empty() && self.current.width + space + word_width > self.max_width {
            self.lines.push(std::mem::take(&mut self.current));
            space = 0.0;
        }

        let mut x = self.current.width + space;
        for (text, style, face, width) in runs {
            self.current.runs.push(PlacedRun {
                text,
                style,
                face,
                x,
                width,
            });
            x += width;
        }
        self.current.width = x;
        self.pending_space = None;
        self.has_text = true;
    }

    fn hard_break(&mut self) {
        self.flush_word();
        self.lines.push(std::mem::take(&mut self.current));
        self.pending_space = None;
    }

    fn block_break(&mut self) {
        self.flush_word();
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
        self.pending_space = None;
    }

    fn finish(mut self) -> (Vec<Line>, bool) {
        self.flush_word();
        if !self.current.is_empty() {
            self.lines.push(self.current);
        }
        (self.lines, self.has_text)
    }
}

fn layout_lines(fonts: &FontBook, tokens: &[Token], max_width: f32) -> (Vec<Line>, bool) {
    let mut builder = LineBuilder::new(fonts, max_width);
    for token in tokens {
        match token {
            Token::Text(text, style) => builder.text(text, style),
            Token::Break => builder.hard_break(),
            Token::BlockBreak => builder.block_break(),
        }
    }
    builder.finish()
}

/// Ascent, descent and line height of a line.
fn line_metrics(line: &Line, root: &RunStyle, fonts: &FontBook, explicit: Option<f32>) -> (f32, f32, f32) {
    let mut ascent = 0.0f32;
    let mut descent = 0.0f32;
    let mut natural = 0.0f32;
    if line.runs.is_empty() {
        let face = fonts.resolve(&root.font_spec());
        ascent = face.face.ascent(root.size);
        descent = face.face.descent(root.size);
        natural = face.face.natural_line_height(root.size);
    }
    for run in &line.runs {
        ascent = ascent.max(run.face.face.ascent(run.style.size));
        descent = descent.max(run.face.face.descent(run.style.size));
        natural = natural.max(run.face.face.natural_line_height(run.style.size));
    }
    (ascent, descent, explicit.unwrap_or(natural))
}

// ============================================================================
// RASTERIZATION
// ============================================================================

fn layer(layers: &mut Vec<(Rgba, Mask)>, color: Rgba, width: usize, height: usize) -> &mut Mask {
    let idx = match layers.iter().position(|(c, _)| *c == color) {
        Some(idx) => idx,
        None => {
            layers.push((color, Mask::new(0, 0, width, height)));
            layers.len() - 1
        }
    };
    &mut layers[idx].1
}

fn rasterize(
    fonts: &FontBook,
    markup: &str,
    width: u32,
    height: u32,
    style: &ContainerStyle,
) -> Result<RgbaImage, MarkupError> {
    if width == 0 || height == 0 {
        return Err(MarkupError::InvalidSize { width, height });
    }

    let root = RunStyle::root(style);
    let tokens = parse(markup, &root);
    let (lines, has_text) = layout_lines(fonts, &tokens, width as f32);
    if !has_text {
        return Err(MarkupError::Empty);
    }

    let (w, h) = (width as usize, height as usize);
    let mut layers: Vec<(Rgba, Mask)> = Vec::new();
    let mut top = 0.0f32;

    for line in &lines {
        if top >= height as f32 {
            break;
        }
        let (ascent, descent, line_height) = line_metrics(line, &root, fonts, style.line_height);
        let baseline = top + (line_height - (ascent + descent)) / 2.0 + ascent;
        let dx = style.text_align.offset(width as f32, line.width);

        for run in &line.runs {
            let size = run.style.size;
            let x = dx + run.x;
            let mask = layer(&mut layers, run.style.color, w, h);
            run.face.draw(&run.text, size, x, baseline, mask);

            let thickness = (size / 16.0).round().max(1.0) as i32;
            if run.style.underline {
                let y = (baseline + size * 0.1).round() as i32;
                mask.fill_rect(x.round() as i32, y, run.width.round() as i32, thickness);
            }
            if run.style.strike {
                let y = (baseline - size * 0.3).round() as i32;
                mask.fill_rect(x.round() as i32, y, run.width.round() as i32, thickness);
            }
        }
        top += line_height;
    }

    let mut bitmap = RgbaImage::new(width, height);
    if let Some(shadow) = style.text_shadow {
        let silhouette = layers
            .iter()
            .fold(Mask::new(0, 0, w, h), |acc, (_, mask)| acc.union(mask));
        paint::paint_shadow(&mut bitmap, &silhouette, shadow);
    }
    for (color, mask) in &layers {
        paint::paint_mask(&mut bitmap, mask, 0, 0, *color);
    }
    Ok(bitmap)
}
