//! # Midiator - Batch Image Synthesizer
//!
//! Midiator renders tabular records onto a shared background image, one PNG
//! per record. Each record field is placed in a box given as percentages of
//! the background and drawn with its own style. It provides:
//!
//! - **Style resolution**: partial field styles resolved against defaults
//! - **Text layout**: greedy word wrap with a line cap per box
//! - **Markup fallback**: HTML-like values rendered through an off-screen container
//! - **Batch generation**: all-or-nothing runs with revocable artifact handles
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use midiator::{
//!     batch::BatchGenerator,
//!     download,
//!     font::FontBook,
//!     model::{FieldLayout, FieldPosition, FieldStyle, Record},
//! };
//!
//! # async fn example() -> Result<(), midiator::MidiatorError> {
//! let background = std::fs::read("card.png")?;
//! let layout = FieldLayout::new()
//!     .field(
//!         "name",
//!         FieldPosition::new(10.0, 10.0, 80.0, 20.0),
//!         FieldStyle { font_size: Some(32.0), ..Default::default() },
//!     )
//!     .field(
//!         "title",
//!         FieldPosition::new(10.0, 40.0, 80.0, 20.0),
//!         FieldStyle::default(),
//!     );
//! let records = vec![
//!     Record::new().with("name", "Ada Lovelace").with("title", "<b>Analyst</b>"),
//!     Record::new().with("name", "Grace Hopper").with("title", "Admiral"),
//! ];
//!
//! let mut generator = BatchGenerator::new(Arc::new(FontBook::builtin()));
//! let artifacts = generator.generate(&records, &background, &layout).await?;
//! download::save_all(&artifacts, "out".as_ref(), download::DEFAULT_STAGGER).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`model`] | Records, field positions, field styles |
//! | [`style`] | Style resolution and colors |
//! | [`layout`] | Greedy word wrap |
//! | [`font`] | Font book, outline and bitmap faces |
//! | [`render`] | Coverage masks and painting |
//! | [`markup`] | Markup detection and rendering |
//! | [`compositor`] | Per-record field drawing |
//! | [`batch`] | Batch generation and artifact handles |
//! | [`download`] | Writing artifacts to disk |
//! | [`server`] | HTTP API |
//! | [`config`] | Configuration |
//! | [`error`] | Error types |

pub mod batch;
pub mod compositor;
pub mod config;
pub mod download;
pub mod error;
pub mod font;
pub mod layout;
pub mod markup;
pub mod model;
pub mod render;
pub mod server;
pub mod style;

// Re-exports for convenience
pub use batch::{ArtifactHandle, BatchGenerator, GeneratedArtifact, HandleRegistry};
pub use compositor::FieldCompositor;
pub use config::SynthConfig;
pub use error::MidiatorError;
pub use model::{FieldLayout, FieldPosition, FieldStyle, Record};
