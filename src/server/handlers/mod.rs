//! HTTP handlers for the server.

pub mod artifacts;
pub mod batch;

use serde::{Deserialize, Serialize};

use crate::batch::GeneratedArtifact;
use crate::model::Record;

/// Artifact as listed over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub index: usize,
    pub filename: String,
    /// Transient handle (`blob:midiator/<uuid>`).
    pub handle: String,
    /// Where the PNG can be fetched while the handle is live.
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Source record, echoed back so clients can label previews.
    pub record: Record,
}

impl From<&GeneratedArtifact> for ArtifactSummary {
    fn from(artifact: &GeneratedArtifact) -> Self {
        Self {
            index: artifact.index,
            filename: artifact.filename.clone(),
            handle: artifact.url(),
            url: format!("/api/artifacts/{}", artifact.handle.id()),
            width: artifact.width,
            height: artifact.height,
            record: artifact.record.clone(),
        }
    }
}
