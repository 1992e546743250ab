//! Batch generation API handler.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::MidiatorError;
use crate::model::{self, FieldLayout, Record};

use super::super::state::AppState;
use super::ArtifactSummary;

/// Response from the batch endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub artifacts: Vec<ArtifactSummary>,
}

fn bad_request(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

/// POST /api/batch - Render one PNG per record.
///
/// Multipart fields: `background` (image file), `records` (JSON array of
/// objects), `layout` (JSON `{ positions, styles }`). Missing fields are
/// reported by batch validation.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, (StatusCode, String)> {
    let mut background: Vec<u8> = Vec::new();
    let mut records: Vec<Record> = Vec::new();
    let mut layout = FieldLayout::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "background" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read background: {}", e)))?;
                background = bytes.to_vec();
            }
            "records" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read records: {}", e)))?;
                records = model::records_from_json(&text).map_err(bad_request)?;
            }
            "layout" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read layout: {}", e)))?;
                layout = FieldLayout::from_json_str(&text).map_err(bad_request)?;
            }
            other => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }

    let mut generator = state.generator.lock().await;
    let artifacts = generator
        .generate(&records, &background, &layout)
        .await
        .map_err(|e| match e {
            MidiatorError::Validation(_) => bad_request(e),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    Ok(Json(BatchResponse {
        artifacts: artifacts.iter().map(ArtifactSummary::from).collect(),
    }))
}
