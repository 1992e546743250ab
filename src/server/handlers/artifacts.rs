//! Artifact listing, preview and release handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::batch::ArtifactHandle;

use super::super::state::AppState;
use super::ArtifactSummary;

/// GET /api/artifacts - Artifacts of the last successful batch.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<ArtifactSummary>> {
    let generator = state.generator.lock().await;
    Json(generator.artifacts().iter().map(ArtifactSummary::from).collect())
}

/// GET /api/artifacts/:id - PNG bytes while the handle is live.
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let handle = ArtifactHandle::parse(&id)
        .ok_or((StatusCode::NOT_FOUND, "Artifact not found".to_string()))?;
    let png = state
        .registry
        .resolve(&handle)
        .ok_or((StatusCode::NOT_FOUND, "Artifact not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png.as_ref().clone()))
}

/// DELETE /api/artifacts - Revoke every current handle.
pub async fn clear(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut generator = state.generator.lock().await;
    let revoked = generator.artifacts().len();
    generator.clear();
    tracing::info!(revoked, "artifacts cleared");
    Json(serde_json::json!({ "revoked": revoked }))
}
