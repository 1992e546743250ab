//! # Fonts
//!
//! A [`FontBook`] maps CSS family names to concrete [`Face`]s. Faces come
//! from font files (rasterized with ab_glyph) or from the built-in Spleen
//! bitmap face, which is the last-resort fallback for any family.
//!
//! Missing bold/italic variants are synthesized: bold by double-striking
//! glyphs, italic by shearing them.
//!
//! ## Font files
//!
//! Files can be registered explicitly (family + path + variant) or picked up
//! from a directory, where the variant comes from the file name suffix:
//!
//! | File | Family | Variant |
//! |------|--------|---------|
//! | `Inter-Regular.ttf` | Inter | regular |
//! | `Inter-Bold.ttf` | Inter | bold |
//! | `Inter-BoldItalic.otf` | Inter | bold italic |
//! | `Lobster.ttf` | Lobster | regular |

pub mod bitmap;
pub mod ttf;

pub use bitmap::BitmapFace;
pub use ttf::TtfFace;

use std::collections::HashMap;
use std::path::Path;

use crate::config::SynthConfig;
use crate::error::MidiatorError;
use crate::render::mask::Mask;
use crate::style::{DEFAULT_FONT_FAMILY, FontSpec};

/// Horizontal shear applied to synthesized italics (x shift per pixel of
/// height above the baseline).
const OBLIQUE_SHEAR: f32 = 0.2;

/// Width measurement used by the text layout engine.
///
/// Implementations must be monotonic (appending text never shrinks the
/// width) for the greedy wrap to keep lines within their box.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> f32;
}

/// Variant emulation applied while rasterizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Synthesis {
    pub bold: bool,
    pub oblique: bool,
}

/// A concrete font able to measure and rasterize text.
#[derive(Debug, Clone)]
pub enum Face {
    Outline(TtfFace),
    Bitmap(BitmapFace),
}

impl Face {
    pub fn name(&self) -> &str {
        match self {
            Face::Outline(f) => f.name(),
            Face::Bitmap(f) => f.name(),
        }
    }

    pub fn ascent(&self, font_size: f32) -> f32 {
        match self {
            Face::Outline(f) => f.ascent(font_size),
            Face::Bitmap(f) => f.ascent(font_size),
        }
    }

    /// Distance below the baseline (positive).
    pub fn descent(&self, font_size: f32) -> f32 {
        match self {
            Face::Outline(f) => f.descent(font_size),
            Face::Bitmap(f) => f.descent(font_size),
        }
    }

    /// The face's own line spacing (ascent + descent + line gap).
    pub fn natural_line_height(&self, font_size: f32) -> f32 {
        match self {
            Face::Outline(f) => f.ascent(font_size) + f.descent(font_size) + f.line_gap(font_size),
            Face::Bitmap(f) => f.ascent(font_size) + f.descent(font_size),
        }
    }

    /// Rasterize one line into `mask`, baseline at `baseline_y`.
    pub fn draw(
        &self,
        text: &str,
        font_size: f32,
        x: f32,
        baseline_y: f32,
        synthesis: Synthesis,
        mask: &mut Mask,
    ) {
        match self {
            Face::Outline(f) => f.draw(text, font_size, x, baseline_y, synthesis, mask),
            Face::Bitmap(f) => f.draw(text, font_size, x, baseline_y, synthesis, mask),
        }
    }
}

impl TextMeasure for Face {
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Face::Outline(f) => f.measure(text, font_size),
            Face::Bitmap(f) => f.measure(text, font_size),
        }
    }
}

/// A face picked for a [`FontSpec`], plus the emulation it needs.
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    pub face: Face,
    pub synthesis: Synthesis,
}

impl ResolvedFace {
    pub fn draw(&self, text: &str, font_size: f32, x: f32, baseline_y: f32, mask: &mut Mask) {
        self.face
            .draw(text, font_size, x, baseline_y, self.synthesis, mask);
    }
}

impl TextMeasure for ResolvedFace {
    /// Advance width, plus the overhang synthesized bold adds past the last glyph.
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        let width = self.face.measure(text, font_size);
        if self.synthesis.bold && !text.is_empty() {
            width + embolden_px(font_size) as f32
        } else {
            width
        }
    }
}

/// Canvas text APIs render every whitespace character as a plain space.
#[inline]
pub(crate) fn normalize_char(ch: char) -> char {
    if ch.is_whitespace() { ' ' } else { ch }
}

/// Extra pixels synthesized bold smears each glyph to the right.
#[inline]
pub(crate) fn embolden_px(font_size: f32) -> i32 {
    (font_size / 24.0).round().max(1.0) as i32
}

/// Horizontal shift of row `y` under synthesized italic.
#[inline]
pub(crate) fn oblique_shift(y: i32, baseline_y: f32, synthesis: Synthesis) -> i32 {
    if synthesis.oblique {
        ((baseline_y - y as f32) * OBLIQUE_SHEAR).round() as i32
    } else {
        0
    }
}

/// Write one coverage sample, applying synthesized bold/italic.
#[inline]
pub(crate) fn plot(
    mask: &mut Mask,
    x: i32,
    y: i32,
    coverage: f32,
    baseline_y: f32,
    font_size: f32,
    synthesis: Synthesis,
) {
    let x = x + oblique_shift(y, baseline_y, synthesis);
    mask.add(x, y, coverage);
    if synthesis.bold {
        for dx in 1..=embolden_px(font_size) {
            mask.add(x + dx, y, coverage);
        }
    }
}

// ============================================================================
// FONT BOOK
// ============================================================================

#[derive(Debug, Clone, Default)]
struct FamilyFaces {
    regular: Option<Face>,
    bold: Option<Face>,
    italic: Option<Face>,
    bold_italic: Option<Face>,
}

impl FamilyFaces {
    fn slot(&mut self, bold: bool, italic: bool) -> &mut Option<Face> {
        match (bold, italic) {
            (false, false) => &mut self.regular,
            (true, false) => &mut self.bold,
            (false, true) => &mut self.italic,
            (true, true) => &mut self.bold_italic,
        }
    }

    /// Closest registered variant, and what must be synthesized on top.
    fn pick(&self, bold: bool, italic: bool) -> Option<ResolvedFace> {
        let candidates: [(&Option<Face>, bool, bool); 4] = match (bold, italic) {
            (true, true) => [
                (&self.bold_italic, true, true),
                (&self.bold, true, false),
                (&self.italic, false, true),
                (&self.regular, false, false),
            ],
            (true, false) => [
                (&self.bold, true, false),
                (&self.regular, false, false),
                (&self.bold_italic, true, true),
                (&self.italic, false, true),
            ],
            (false, true) => [
                (&self.italic, false, true),
                (&self.regular, false, false),
                (&self.bold_italic, true, true),
                (&self.bold, true, false),
            ],
            (false, false) => [
                (&self.regular, false, false),
                (&self.bold, true, false),
                (&self.italic, false, true),
                (&self.bold_italic, true, true),
            ],
        };

        candidates.into_iter().find_map(|(face, has_bold, has_italic)| {
            face.as_ref().map(|face| ResolvedFace {
                face: face.clone(),
                synthesis: Synthesis {
                    bold: bold && !has_bold,
                    oblique: italic && !has_italic,
                },
            })
        })
    }
}

/// Family name to faces, with the built-in bitmap face as final fallback.
#[derive(Debug, Clone)]
pub struct FontBook {
    families: HashMap<String, FamilyFaces>,
    default_family: String,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lookup key for a family name: case, spaces, hyphens and underscores are
/// ignored so `Open Sans` matches `OpenSans-Regular.ttf`.
fn family_key(family: &str) -> String {
    family
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split a font file stem into family and variant (`Inter-BoldItalic`).
fn parse_font_stem(stem: &str) -> (String, bool, bool) {
    if let Some((family, suffix)) = stem.rsplit_once('-') {
        let s = suffix.to_ascii_lowercase();
        let known = matches!(
            s.as_str(),
            "regular" | "normal" | "book" | "roman" | "bold" | "italic" | "oblique"
                | "bolditalic" | "boldoblique"
        );
        if known && !family.is_empty() {
            let bold = s.starts_with("bold");
            let italic = s.ends_with("italic") || s.ends_with("oblique");
            return (family.to_string(), bold, italic);
        }
    }
    (stem.to_string(), false, false)
}

impl FontBook {
    /// A font book with no font files: everything renders with the bitmap face.
    pub fn builtin() -> Self {
        Self {
            families: HashMap::new(),
            default_family: DEFAULT_FONT_FAMILY.to_string(),
        }
    }

    /// Family tried after every family of a request has missed.
    pub fn with_default_family(mut self, family: impl Into<String>) -> Self {
        self.default_family = family.into();
        self
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    /// Register a face for a family variant, replacing any previous one.
    pub fn add_face(&mut self, family: &str, bold: bool, italic: bool, face: Face) {
        let entry = self.families.entry(family_key(family)).or_default();
        *entry.slot(bold, italic) = Some(face);
    }

    /// Load one font file for a family variant.
    pub fn load_file(
        &mut self,
        family: &str,
        path: &Path,
        bold: bool,
        italic: bool,
    ) -> Result<(), MidiatorError> {
        let face = TtfFace::load(path)?;
        tracing::debug!(family, path = %path.display(), bold, italic, "loaded font");
        self.add_face(family, bold, italic, Face::Outline(face));
        Ok(())
    }

    /// Load every `.ttf`/`.otf` file in a directory, naming families after
    /// the file names. Returns how many faces were loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, MidiatorError> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            MidiatorError::Font(format!("Failed to read font dir {}: {}", dir.display(), e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_font = path
                .extension()
                .map(|e| {
                    let e = e.to_string_lossy().to_ascii_lowercase();
                    e == "ttf" || e == "otf"
                })
                .unwrap_or(false);
            if is_font {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let (family, bold, italic) = parse_font_stem(&stem);
            match self.load_file(&family, &path, bold, italic) {
                Ok(()) => loaded += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping font"),
            }
        }
        Ok(loaded)
    }

    /// Build a font book from configuration: explicit entries, then font
    /// directories.
    pub fn from_config(config: &SynthConfig) -> Result<Self, MidiatorError> {
        let mut book = FontBook::builtin().with_default_family(config.default_family.clone());
        for entry in &config.fonts {
            book.load_file(&entry.family, &entry.path, entry.is_bold(), entry.is_italic())?;
        }
        for dir in &config.font_dirs {
            let loaded = book.load_dir(dir)?;
            tracing::info!(dir = %dir.display(), loaded, "loaded font directory");
        }
        Ok(book)
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.contains_key(&family_key(family))
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    /// Pick a face for a request: each listed family in order, then the
    /// default family, then the built-in bitmap face.
    pub fn resolve(&self, spec: &FontSpec) -> ResolvedFace {
        let default = self.default_family.as_str();
        for family in spec
            .families
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(default))
        {
            if let Some(faces) = self.families.get(&family_key(family))
                && let Some(resolved) = faces.pick(spec.bold, spec.italic)
            {
                return resolved;
            }
        }

        ResolvedFace {
            face: Face::Bitmap(BitmapFace),
            synthesis: Synthesis {
                bold: spec.bold,
                oblique: spec.italic,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(family: &str, bold: bool, italic: bool) -> FontSpec {
        let mut spec = FontSpec::new(family, 24.0);
        spec.bold = bold;
        spec.italic = italic;
        spec
    }

    #[test]
    fn test_parse_font_stem() {
        assert_eq!(parse_font_stem("Inter-Regular"), ("Inter".into(), false, false));
        assert_eq!(parse_font_stem("Inter-Bold"), ("Inter".into(), true, false));
        assert_eq!(
            parse_font_stem("Open_Sans-BoldItalic"),
            ("Open_Sans".into(), true, true)
        );
        assert_eq!(parse_font_stem("Lobster"), ("Lobster".into(), false, false));
        assert_eq!(
            parse_font_stem("Fira-Code"),
            ("Fira-Code".into(), false, false)
        );
    }

    #[test]
    fn test_family_key_ignores_spacing() {
        assert_eq!(family_key("Open Sans"), family_key("OpenSans"));
        assert_eq!(family_key("open_sans"), "opensans");
    }

    #[test]
    fn test_builtin_fallback_synthesizes_variants() {
        let book = FontBook::builtin();
        let resolved = book.resolve(&spec("Nope", true, true));
        assert!(matches!(resolved.face, Face::Bitmap(_)));
        assert_eq!(
            resolved.synthesis,
            Synthesis {
                bold: true,
                oblique: true
            }
        );
    }

    #[test]
    fn test_pick_prefers_real_variant() {
        let mut book = FontBook::builtin();
        book.add_face("Test", false, false, Face::Bitmap(BitmapFace));
        book.add_face("Test", true, false, Face::Bitmap(BitmapFace));

        let bold = book.resolve(&spec("Test", true, false));
        assert_eq!(bold.synthesis, Synthesis::default());

        let bold_italic = book.resolve(&spec("Test", true, true));
        assert_eq!(
            bold_italic.synthesis,
            Synthesis {
                bold: false,
                oblique: true
            }
        );
        assert!(book.has_family("test"));
    }

    #[test]
    fn test_load_dir_missing_is_error() {
        let mut book = FontBook::builtin();
        let err = book
            .load_dir(Path::new("/definitely/not/a/font/dir"))
            .unwrap_err();
        assert!(matches!(err, MidiatorError::Font(_)));
    }

    #[test]
    fn test_load_dir_skips_invalid_fonts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Broken-Bold.ttf"), b"not a font").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        let mut book = FontBook::builtin();
        assert_eq!(book.load_dir(dir.path()).unwrap(), 0);
        assert_eq!(book.family_count(), 0);
    }

    #[test]
    fn test_synthetic_bold_widens_strokes() {
        let mut plain = Mask::new(0, 0, 40, 30);
        let mut bold = Mask::new(0, 0, 40, 30);
        let face = Face::Bitmap(BitmapFace);
        face.draw("l", 24.0, 0.0, 19.2, Synthesis::default(), &mut plain);
        face.draw(
            "l",
            24.0,
            0.0,
            19.2,
            Synthesis {
                bold: true,
                oblique: false,
            },
            &mut bold,
        );
        let count = |m: &Mask| m.data.iter().filter(|&&v| v > 0.0).count();
        assert!(count(&bold) > count(&plain));
    }

    #[test]
    fn test_synthetic_bold_measure_covers_overhang() {
        let bold = ResolvedFace {
            face: Face::Bitmap(BitmapFace),
            synthesis: Synthesis {
                bold: true,
                oblique: false,
            },
        };
        let width = bold.measure("ll", 48.0);
        assert_eq!(width, 48.0 + 2.0);
        assert_eq!(bold.measure("", 48.0), 0.0);

        // Every covered pixel sits inside the measured width.
        let mut mask = Mask::new(0, 0, 80, 60);
        bold.draw("ll", 48.0, 0.0, 38.4, &mut mask);
        for y in 0..60 {
            for x in width.ceil() as i32..80 {
                assert_eq!(mask.get(x, y), 0.0, "pixel {},{} past the measured width", x, y);
            }
        }
    }
}
