//! Input data model: records, field positions, field styles.
//!
//! All types derive (or implement) `Serialize + Deserialize` so the same
//! types work for Rust API construction and for the JSON files and request
//! bodies the CLI and server accept.
//!
//! Style and position values come from a hand-edited UI, so numeric
//! properties are deserialized leniently: JSON numbers, numeric strings and
//! `"24px"` all parse, and anything else becomes "absent" instead of failing
//! the whole layout.

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::MidiatorError;

// ============================================================================
// RECORD
// ============================================================================

/// One row of input data: field name to string value, in input key order.
///
/// Key order matters: fields are composited in this order, so later fields
/// paint over earlier ones where their boxes overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Replacing an existing key keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping field names to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                    let text = match value {
                        serde_json::Value::Null => String::new(),
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    record.insert(key, text);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Parse a JSON array of record objects.
pub fn records_from_json(json: &str) -> Result<Vec<Record>, MidiatorError> {
    Ok(serde_json::from_str(json)?)
}

// ============================================================================
// LENIENT SCALARS
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Num(f64),
    Bool(bool),
    Text(String),
    Other(IgnoredAny),
}

impl Loose {
    fn to_f32(&self) -> Option<f32> {
        let value = match self {
            Loose::Num(n) => *n as f32,
            Loose::Text(s) => {
                let s = s.trim();
                let s = s.strip_suffix("px").unwrap_or(s).trim_end();
                s.parse::<f32>().ok()?
            }
            Loose::Bool(_) | Loose::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    fn to_bool(&self) -> Option<bool> {
        match self {
            Loose::Bool(b) => Some(*b),
            Loose::Num(n) => Some(*n != 0.0),
            Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            Loose::Other(_) => None,
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            Loose::Text(s) => Some(s),
            Loose::Num(n) => Some(format_number(n)),
            Loose::Bool(_) | Loose::Other(_) => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn lenient_f32<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<Loose> = Option::deserialize(deserializer)?;
    Ok(v.and_then(|v| v.to_f32()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<Loose> = Option::deserialize(deserializer)?;
    Ok(v.and_then(|v| v.to_bool()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<Loose> = Option::deserialize(deserializer)?;
    Ok(v.and_then(Loose::into_text))
}

fn lenient_percent<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f32(deserializer)?.unwrap_or(0.0))
}

fn lenient_visible<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_bool(deserializer)?.unwrap_or(true))
}

fn default_visible() -> bool {
    true
}

// ============================================================================
// FIELD POSITION / STYLE
// ============================================================================

/// Placement of one field, as percentages (0-100) of the background size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldPosition {
    #[serde(default, deserialize_with = "lenient_percent")]
    pub x: f32,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub y: f32,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub width: f32,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub height: f32,
    #[serde(default = "default_visible", deserialize_with = "lenient_visible")]
    pub visible: bool,
}

impl FieldPosition {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            visible: true,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Per-field text style. Every property is optional; see
/// [`crate::style::resolve`] for the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldStyle {
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(deserialize_with = "lenient_f32", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// "normal", "bold", or a numeric weight (JSON numbers accepted).
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Only honoured by the markup path; plain text is always left aligned.
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub text_shadow: Option<bool>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub shadow_color: Option<String>,
    #[serde(deserialize_with = "lenient_f32", skip_serializing_if = "Option::is_none")]
    pub shadow_blur: Option<f32>,
    #[serde(deserialize_with = "lenient_f32", skip_serializing_if = "Option::is_none")]
    pub shadow_offset_x: Option<f32>,
    #[serde(deserialize_with = "lenient_f32", skip_serializing_if = "Option::is_none")]
    pub shadow_offset_y: Option<f32>,
    #[serde(deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub text_stroke: Option<bool>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(deserialize_with = "lenient_f32", skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    /// Explicit line height for the markup path, as a multiple of font size.
    #[serde(deserialize_with = "lenient_f32", skip_serializing_if = "Option::is_none")]
    pub line_height_multiplier: Option<f32>,
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Positions and styles for every field, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLayout {
    pub positions: HashMap<String, FieldPosition>,
    pub styles: HashMap<String, FieldStyle>,
}

impl FieldLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: place and style one field.
    pub fn field(
        mut self,
        name: impl Into<String>,
        position: FieldPosition,
        style: FieldStyle,
    ) -> Self {
        let name = name.into();
        self.positions.insert(name.clone(), position);
        self.styles.insert(name, style);
        self
    }

    pub fn position(&self, name: &str) -> Option<&FieldPosition> {
        self.positions.get(name)
    }

    pub fn style(&self, name: &str) -> Option<&FieldStyle> {
        self.styles.get(name)
    }

    /// Number of fields marked visible.
    pub fn visible_count(&self) -> usize {
        self.positions.values().filter(|p| p.visible).count()
    }

    pub fn from_json_str(json: &str) -> Result<Self, MidiatorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, MidiatorError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MidiatorError::Config(format!("Failed to read layout {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_record_preserves_key_order() {
        let records = records_from_json(r#"[{"zeta": "1", "alpha": "2", "mid": "3"}]"#).unwrap();
        let keys: Vec<&str> = records[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_record_stringifies_scalars() {
        let records =
            records_from_json(r#"[{"n": 42, "b": true, "missing": null, "s": "x"}]"#).unwrap();
        let r = &records[0];
        assert_eq!(r.get("n"), Some("42"));
        assert_eq!(r.get("b"), Some("true"));
        assert_eq!(r.get("missing"), Some(""));
        assert_eq!(r.get("s"), Some("x"));
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let r = Record::new().with("a", "1").with("b", "2").with("a", "3");
        let pairs: Vec<(&str, &str)> = r.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_record_serializes_as_object() {
        let r = Record::new().with("name", "Ada");
        assert_eq!(serde_json::to_string(&r).unwrap(), r#"{"name":"Ada"}"#);
    }

    #[test]
    fn test_position_defaults_visible() {
        let p: FieldPosition =
            serde_json::from_str(r#"{"x": 10, "y": "20", "width": 30, "height": 40}"#).unwrap();
        assert_eq!(p, FieldPosition::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn test_style_lenient_values() {
        let s: FieldStyle = serde_json::from_str(
            r##"{
                "fontSize": "32px",
                "fontWeight": 700,
                "textShadow": "true",
                "shadowBlur": "lots",
                "strokeWidth": [1, 2],
                "color": "#ff0000"
            }"##,
        )
        .unwrap();
        assert_eq!(s.font_size, Some(32.0));
        assert_eq!(s.font_weight.as_deref(), Some("700"));
        assert_eq!(s.text_shadow, Some(true));
        assert_eq!(s.shadow_blur, None);
        assert_eq!(s.stroke_width, None);
        assert_eq!(s.color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_layout_visible_count() {
        let layout = FieldLayout::new()
            .field("a", FieldPosition::new(0.0, 0.0, 10.0, 10.0), FieldStyle::default())
            .field(
                "b",
                FieldPosition::new(0.0, 0.0, 10.0, 10.0).hidden(),
                FieldStyle::default(),
            );
        assert_eq!(layout.visible_count(), 1);
    }

    #[test]
    fn test_layout_from_json() {
        let layout = FieldLayout::from_json_str(
            r#"{
                "positions": {"title": {"x": 5, "y": 5, "width": 90, "height": 20, "visible": false}},
                "styles": {"title": {"fontFamily": "Inter"}}
            }"#,
        )
        .unwrap();
        assert!(!layout.position("title").unwrap().visible);
        assert_eq!(
            layout.style("title").unwrap().font_family.as_deref(),
            Some("Inter")
        );
    }
}
