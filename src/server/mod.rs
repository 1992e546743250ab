//! # HTTP Server for Batch Generation
//!
//! Exposes the batch generator over HTTP: upload a background, records and
//! a layout, then fetch the rendered PNGs through their transient handles.
//!
//! ## Usage
//!
//! ```bash
//! midiator serve --listen 0.0.0.0:8080 --config midiator.json
//! ```
//!
//! | Route | Description |
//! |-------|-------------|
//! | `POST /api/batch` | Multipart `background`, `records`, `layout`; returns the artifacts |
//! | `GET /api/artifacts` | Artifacts of the last batch |
//! | `GET /api/artifacts/:id` | PNG bytes, 404 once revoked |
//! | `DELETE /api/artifacts` | Revoke all current handles |

mod handlers;
mod state;

pub use crate::config::ServerConfig;
pub use handlers::ArtifactSummary;
pub use handlers::batch::BatchResponse;
pub use state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::MidiatorError;

/// Upload limit for batch requests (background image plus JSON).
const MAX_BATCH_BODY: usize = 50 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/batch",
            post(handlers::batch::generate).layer(DefaultBodyLimit::max(MAX_BATCH_BODY)),
        )
        .route(
            "/api/artifacts",
            get(handlers::artifacts::list).delete(handlers::artifacts::clear),
        )
        .route("/api/artifacts/:id", get(handlers::artifacts::get))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use midiator::config::SynthConfig;
/// use midiator::server::{serve, AppState, ServerConfig};
///
/// # async fn example() -> Result<(), midiator::MidiatorError> {
/// let synth = SynthConfig::default();
/// let fonts = Arc::new(synth.font_book()?);
/// let state = Arc::new(AppState::new(fonts));
///
/// serve(ServerConfig { listen_addr: "0.0.0.0:8080".to_string() }, state).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig, state: Arc<AppState>) -> Result<(), MidiatorError> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            MidiatorError::Config(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;
    tracing::info!(addr = %config.listen_addr, "midiator HTTP server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontBook;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;
    use tower::ServiceExt;

    const BOUNDARY: &str = "midiator-test-boundary";

    fn app_state() -> Arc<AppState> {
        Arc::new(AppState::new(Arc::new(FontBook::builtin())))
    }

    fn background_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(80, 40, Rgba([200, 220, 240, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match filename {
                Some(f) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, f
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn batch_request(records: &str) -> Request<Body> {
        let background = background_png();
        let layout = r#"{"positions":{"name":{"x":5,"y":5,"width":90,"height":90}},"styles":{"name":{"fontSize":12}}}"#;
        let body = multipart_body(&[
            ("background", Some("bg.png"), &background),
            ("records", None, records.as_bytes()),
            ("layout", None, layout.as_bytes()),
        ]);
        Request::builder()
            .method("POST")
            .uri("/api/batch")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_batch_then_fetch_then_clear() {
        let state = app_state();
        let (status, body) = send(
            &state,
            batch_request(r#"[{"name":"Ada"},{"name":"Grace"}]"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let response: BatchResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response.artifacts.len(), 2);
        assert_eq!(response.artifacts[0].filename, "midiator_001.png");
        assert_eq!(response.artifacts[1].filename, "midiator_002.png");
        assert!(response.artifacts[0].handle.starts_with("blob:midiator/"));
        assert_eq!(response.artifacts[1].record.get("name"), Some("Grace"));

        let url = response.artifacts[1].url.clone();
        let (status, png) = send(&state, get(&url)).await;
        assert_eq!(status, StatusCode::OK);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (80, 40));

        let (status, body) = send(&state, get("/api/artifacts")).await;
        assert_eq!(status, StatusCode::OK);
        let listed: Vec<ArtifactSummary> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed, response.artifacts);

        let delete = Request::builder()
            .method("DELETE")
            .uri("/api/artifacts")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&state, delete).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&state, get(&url)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_empty_records_is_bad_request() {
        let state = app_state();
        let (status, body) = send(&state, batch_request("[]")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).contains("record"));
    }

    #[tokio::test]
    async fn test_malformed_records_is_bad_request() {
        let state = app_state();
        let (status, _) = send(&state, batch_request("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_artifact_is_not_found() {
        let state = app_state();
        let (status, _) = send(&state, get("/api/artifacts/not-a-uuid")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(
            &state,
            get("/api/artifacts/67e55044-10b1-426f-9247-bb680e5fe0c8"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
