//! # Batch Generator
//!
//! Renders one PNG artifact per record on top of a shared background.
//!
//! A batch is all or nothing. Preconditions are checked before any work;
//! then the previous run's artifacts are released, the background is
//! decoded once, and every record is composited and encoded in order.
//! Handles are registered only after the last record has been encoded, so a
//! run that fails or unwinds part way leaves no live handles behind.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use midiator::batch::BatchGenerator;
//! use midiator::font::FontBook;
//! use midiator::model::{FieldLayout, FieldPosition, FieldStyle, Record};
//!
//! # async fn example(background_png: Vec<u8>) -> Result<(), midiator::MidiatorError> {
//! let mut generator = BatchGenerator::new(Arc::new(FontBook::builtin()));
//! let layout = FieldLayout::new().field(
//!     "name",
//!     FieldPosition::new(10.0, 10.0, 80.0, 20.0),
//!     FieldStyle::default(),
//! );
//! let records = vec![Record::new().with("name", "Ada Lovelace")];
//!
//! let artifacts = generator.generate(&records, &background_png, &layout).await?;
//! assert_eq!(artifacts[0].filename, "midiator_001.png");
//! # Ok(())
//! # }
//! ```

pub mod handles;

pub use handles::{ArtifactHandle, HandleRegistry};

use std::io::Cursor;
use std::sync::Arc;

use image::RgbaImage;
use serde::Serialize;

use crate::compositor::FieldCompositor;
use crate::error::MidiatorError;
use crate::font::FontBook;
use crate::markup::MarkupRenderer;
use crate::model::{FieldLayout, Record};

/// Download file name for the record at `index` (0-based).
pub fn artifact_filename(index: usize) -> String {
    format!("midiator_{:03}.png", index + 1)
}

/// One rendered record.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArtifact {
    pub index: usize,
    pub filename: String,
    pub handle: ArtifactHandle,
    /// The record this artifact was rendered from.
    pub record: Record,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub png: Arc<Vec<u8>>,
}

impl GeneratedArtifact {
    /// Display URL of the transient handle.
    pub fn url(&self) -> String {
        self.handle.to_string()
    }
}

/// Check batch preconditions without doing any work.
pub fn validate(
    records: &[Record],
    background: &[u8],
    layout: &FieldLayout,
) -> Result<(), MidiatorError> {
    if background.is_empty() {
        return Err(MidiatorError::Validation(
            "A background image is required".to_string(),
        ));
    }
    if records.is_empty() {
        return Err(MidiatorError::Validation(
            "At least one record is required".to_string(),
        ));
    }
    if layout.visible_count() == 0 {
        return Err(MidiatorError::Validation(
            "At least one visible field position is required".to_string(),
        ));
    }
    Ok(())
}

fn decode_background(bytes: &[u8]) -> Result<RgbaImage, MidiatorError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| MidiatorError::Image(format!("Failed to decode background: {}", e)))?;
    Ok(image.to_rgba8())
}

fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>, MidiatorError> {
    let mut png_bytes = Vec::new();
    surface
        .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| MidiatorError::Image(format!("PNG encoding failed: {}", e)))?;
    Ok(png_bytes)
}

/// Encoded PNG for one record, not yet visible through a handle.
struct RenderedRecord {
    width: u32,
    height: u32,
    png: Arc<Vec<u8>>,
}

/// Decoded background, kept while the same bytes are submitted again.
#[derive(Debug)]
struct CachedBackground {
    bytes: Vec<u8>,
    image: Arc<RgbaImage>,
}

#[derive(Debug)]
pub struct BatchGenerator {
    compositor: FieldCompositor,
    registry: HandleRegistry,
    artifacts: Vec<GeneratedArtifact>,
    background: Option<CachedBackground>,
}

impl BatchGenerator {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self::with_compositor(FieldCompositor::new(fonts))
    }

    pub fn with_compositor(compositor: FieldCompositor) -> Self {
        Self {
            compositor,
            registry: HandleRegistry::new(),
            artifacts: Vec::new(),
            background: None,
        }
    }

    /// Share an existing registry (the server resolves handles through it).
    pub fn with_registry(mut self, registry: HandleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_markup_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.compositor.set_markup_renderer(renderer);
        self
    }

    pub fn compositor(&self) -> &FieldCompositor {
        &self.compositor
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Artifacts of the last successful run.
    pub fn artifacts(&self) -> &[GeneratedArtifact] {
        &self.artifacts
    }

    /// Revoke and forget the current artifacts.
    pub fn clear(&mut self) {
        let revoked = self
            .registry
            .revoke_all(self.artifacts.iter().map(|a| &a.handle));
        if revoked > 0 {
            tracing::debug!(revoked, "released previous artifacts");
        }
        self.artifacts.clear();
    }

    /// Render one artifact per record.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub async fn generate(
        &mut self,
        records: &[Record],
        background: &[u8],
        layout: &FieldLayout,
    ) -> Result<Vec<GeneratedArtifact>, MidiatorError> {
        validate(records, background, layout)?;
        self.clear();
        tracing::info!("batch started");

        let surface = self.background_image(background).await?;

        let mut rendered = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match self.render_record(index, record, &surface, layout).await {
                Ok(output) => rendered.push(output),
                Err(e) => {
                    tracing::error!(index, error = %e, "batch aborted");
                    return Err(e);
                }
            }
        }

        let produced: Vec<GeneratedArtifact> = rendered
            .into_iter()
            .zip(records)
            .enumerate()
            .map(|(index, (output, record))| GeneratedArtifact {
                index,
                filename: artifact_filename(index),
                handle: self.registry.register(Arc::clone(&output.png)),
                record: record.clone(),
                width: output.width,
                height: output.height,
                png: output.png,
            })
            .collect();

        tracing::info!(artifacts = produced.len(), "batch finished");
        self.artifacts = produced.clone();
        Ok(produced)
    }

    async fn background_image(&mut self, bytes: &[u8]) -> Result<Arc<RgbaImage>, MidiatorError> {
        if let Some(cached) = &self.background
            && cached.bytes == bytes
        {
            tracing::debug!("reusing decoded background");
            return Ok(Arc::clone(&cached.image));
        }

        let owned = bytes.to_vec();
        let image = tokio::task::spawn_blocking(move || decode_background(&owned))
            .await
            .map_err(|e| MidiatorError::Task(e.to_string()))??;
        let image = Arc::new(image);
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "decoded background"
        );

        self.background = Some(CachedBackground {
            bytes: bytes.to_vec(),
            image: Arc::clone(&image),
        });
        Ok(image)
    }

    async fn render_record(
        &self,
        index: usize,
        record: &Record,
        background: &RgbaImage,
        layout: &FieldLayout,
    ) -> Result<RenderedRecord, MidiatorError> {
        let mut surface = background.clone();
        let drawn = self.compositor.composite(&mut surface, record, layout).await;
        tracing::debug!(index, drawn, "record composited");

        let (width, height) = surface.dimensions();
        let png = tokio::task::spawn_blocking(move || encode_png(&surface))
            .await
            .map_err(|e| MidiatorError::Task(e.to_string()))??;
        Ok(RenderedRecord {
            width,
            height,
            png: Arc::new(png),
        })
    }
}

impl Drop for BatchGenerator {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldPosition, FieldStyle};
    use image::Rgba;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([240, 240, 240, 255]));
        encode_png(&img).unwrap()
    }

    fn layout() -> FieldLayout {
        FieldLayout::new().field(
            "name",
            FieldPosition::new(10.0, 10.0, 80.0, 50.0),
            FieldStyle::default(),
        )
    }

    #[test]
    fn test_artifact_filename() {
        assert_eq!(artifact_filename(0), "midiator_001.png");
        assert_eq!(artifact_filename(41), "midiator_042.png");
        assert_eq!(artifact_filename(999), "midiator_1000.png");
    }

    #[test]
    fn test_validate() {
        let records = vec![Record::new().with("name", "x")];
        assert!(validate(&records, &png(4, 4), &layout()).is_ok());
        assert!(validate(&records, &[], &layout()).unwrap_err().is_validation());
        assert!(validate(&[], &png(4, 4), &layout()).unwrap_err().is_validation());

        let hidden = FieldLayout::new().field(
            "name",
            FieldPosition::new(0.0, 0.0, 10.0, 10.0).hidden(),
            FieldStyle::default(),
        );
        assert!(validate(&records, &png(4, 4), &hidden).unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_generate_and_rerun_revokes() {
        let mut generator = BatchGenerator::new(Arc::new(FontBook::builtin()));
        let records = vec![
            Record::new().with("name", "one"),
            Record::new().with("name", "two"),
        ];
        let background = png(64, 32);

        let first = generator.generate(&records, &background, &layout()).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(generator.registry().len(), 2);
        assert!(generator.background.is_some());

        let second = generator.generate(&records[..1], &background, &layout()).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(generator.registry().len(), 1);
        assert!(generator.registry().resolve(&first[0].handle).is_none());
        assert!(generator.registry().resolve(&second[0].handle).is_some());
    }

    #[tokio::test]
    async fn test_validation_keeps_previous_artifacts() {
        let mut generator = BatchGenerator::new(Arc::new(FontBook::builtin()));
        let records = vec![Record::new().with("name", "one")];
        generator.generate(&records, &png(8, 8), &layout()).await.unwrap();

        let err = generator.generate(&[], &png(8, 8), &layout()).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(generator.artifacts().len(), 1);
        assert_eq!(generator.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_background_fails_cleanly() {
        let mut generator = BatchGenerator::new(Arc::new(FontBook::builtin()));
        let records = vec![Record::new().with("name", "one")];
        generator.generate(&records, &png(8, 8), &layout()).await.unwrap();

        let err = generator
            .generate(&records, b"definitely not an image", &layout())
            .await
            .unwrap_err();
        assert!(matches!(err, MidiatorError::Image(_)));
        assert!(generator.artifacts().is_empty());
        assert!(generator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_drop_revokes_handles() {
        let registry = HandleRegistry::new();
        {
            let mut generator =
                BatchGenerator::new(Arc::new(FontBook::builtin())).with_registry(registry.clone());
            let records = vec![Record::new().with("name", "one")];
            generator.generate(&records, &png(8, 8), &layout()).await.unwrap();
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }
}
