//! # Configuration
//!
//! Synthesizer settings, loaded from a JSON file and overridden by CLI flags.
//!
//! ```json
//! {
//!   "fonts": [
//!     { "family": "Inter", "path": "fonts/Inter-Regular.ttf" },
//!     { "family": "Inter", "path": "fonts/Inter-Bold.ttf", "weight": "bold" }
//!   ],
//!   "font_dirs": ["/usr/share/fonts/truetype"],
//!   "default_family": "Arial",
//!   "download_stagger_ms": 100
//! }
//! ```
//!
//! Every key is optional; an empty object gives the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MidiatorError;
use crate::font::FontBook;
use crate::style::{self, DEFAULT_FONT_FAMILY};

/// Delay between consecutive file writes of a batch download.
pub const DEFAULT_DOWNLOAD_STAGGER_MS: u64 = 100;

/// One font file bound to a family variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontEntry {
    pub family: String,
    pub path: PathBuf,
    /// CSS weight (`bold`, `700`, ...). Bold when 600 or above.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    /// CSS style (`italic`, `oblique`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl FontEntry {
    pub fn is_bold(&self) -> bool {
        self.weight.as_deref().is_some_and(style::is_bold_weight)
    }

    pub fn is_italic(&self) -> bool {
        self.style.as_deref().is_some_and(style::is_italic_style)
    }
}

/// Fonts and batch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub fonts: Vec<FontEntry>,
    pub font_dirs: Vec<PathBuf>,
    /// Family used when none of a field's families is available.
    pub default_family: String,
    pub download_stagger_ms: u64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            fonts: Vec::new(),
            font_dirs: Vec::new(),
            default_family: DEFAULT_FONT_FAMILY.to_string(),
            download_stagger_ms: DEFAULT_DOWNLOAD_STAGGER_MS,
        }
    }
}

impl SynthConfig {
    pub fn from_json_str(json: &str) -> Result<Self, MidiatorError> {
        serde_json::from_str(json)
            .map_err(|e| MidiatorError::Config(format!("Invalid configuration: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, MidiatorError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MidiatorError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.download_stagger_ms)
    }

    pub fn font_book(&self) -> Result<FontBook, MidiatorError> {
        FontBook::from_config(self)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(SynthConfig::from_json_str("{}").unwrap(), SynthConfig::default());
        let config = SynthConfig::default();
        assert_eq!(config.default_family, "Arial");
        assert_eq!(config.stagger(), Duration::from_millis(100));
    }

    #[test]
    fn test_font_entries() {
        let config = SynthConfig::from_json_str(
            r#"{
                "fonts": [
                    { "family": "Inter", "path": "Inter-Regular.ttf" },
                    { "family": "Inter", "path": "Inter-BoldItalic.ttf", "weight": "700", "style": "italic" }
                ],
                "download_stagger_ms": 0
            }"#,
        )
        .unwrap();
        assert_eq!(config.fonts.len(), 2);
        assert!(!config.fonts[0].is_bold());
        assert!(config.fonts[1].is_bold());
        assert!(config.fonts[1].is_italic());
        assert_eq!(config.stagger(), Duration::ZERO);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let err = SynthConfig::from_json_str(r#"{ "fonts": 3 }"#).unwrap_err();
        assert!(matches!(err, MidiatorError::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SynthConfig::load(Path::new("/no/such/midiator.json")).unwrap_err();
        assert!(matches!(err, MidiatorError::Config(_)));
    }

    #[test]
    fn test_missing_font_file_fails_font_book() {
        let config = SynthConfig {
            fonts: vec![FontEntry {
                family: "Ghost".into(),
                path: "/no/such/font.ttf".into(),
                weight: None,
                style: None,
            }],
            ..Default::default()
        };
        assert!(matches!(config.font_book(), Err(MidiatorError::Font(_))));
    }
}
