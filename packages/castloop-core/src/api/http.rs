//! HTTP route handlers.
//!
//! All handlers are thin - they validate the body and delegate to
//! [`SessionController`](crate::services::SessionController).

use axum::{
    extract::{rejection::JsonRejection, State},
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::response::{api_status, api_success};
use crate::api::AppState;
use crate::error::{CastLoopError, CastLoopResult};
use crate::protocol_constants::{SERVICE_ID, STREAM_PATH};

// ─────────────────────────────────────────────────────────────────────────────
// Request bodies
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PlayRequest {
    device_name: Option<String>,
    volume: Option<f32>,
    #[serde(rename = "loop")]
    loop_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct StopRequest {
    device_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumeRequest {
    device_name: Option<String>,
    volume: Option<f32>,
}

/// Unwraps a JSON body, turning extractor rejections into `InvalidRequest`.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> CastLoopResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| CastLoopError::InvalidRequest(rejection.body_text()))
}

fn required<T>(value: Option<T>, field: &str) -> CastLoopResult<T> {
    value.ok_or_else(|| CastLoopError::InvalidRequest(format!("missing field `{}`", field)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
///
/// `/stream` serves the configured media file; any other path falls through
/// to the static directory when one is configured.
pub fn create_router(state: AppState) -> Router {
    let media_file = state.config.media_file.clone();
    let static_dir = state.config.static_dir.clone();

    // Cast receivers fetch media cross-origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/devices", get(list_devices))
        .route("/api/status", get(get_status))
        .route("/play", post(handle_play))
        .route("/stop", post(handle_stop))
        .route("/volume", post(handle_volume))
        .with_state(state)
        .route_service(STREAM_PATH, ServeFile::new(media_file));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(cors).layer(TraceLayer::new_for_http())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
    }))
}

async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    let devices: Vec<_> = state
        .registry
        .snapshot()
        .into_iter()
        .map(|name| json!({ "name": name }))
        .collect();
    api_success(devices)
}

async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.controller.status())
}

/// Starts looped playback. `volume` and `loop` fall back to configured defaults.
async fn handle_play(
    State(state): State<AppState>,
    payload: Result<Json<PlayRequest>, JsonRejection>,
) -> CastLoopResult<impl IntoResponse> {
    let request = body(payload)?;
    let device_name = required(request.device_name, "device_name")?;

    state
        .controller
        .play(&device_name, request.volume, request.loop_enabled)
        .await?;
    Ok(api_status("playing"))
}

async fn handle_stop(
    State(state): State<AppState>,
    payload: Result<Json<StopRequest>, JsonRejection>,
) -> CastLoopResult<impl IntoResponse> {
    let request = body(payload)?;
    let device_name = required(request.device_name, "device_name")?;

    state.controller.stop(&device_name).await?;
    Ok(api_status("stopped"))
}

async fn handle_volume(
    State(state): State<AppState>,
    payload: Result<Json<VolumeRequest>, JsonRejection>,
) -> CastLoopResult<impl IntoResponse> {
    let request = body(payload)?;
    let device_name = required(request.device_name, "device_name")?;
    let volume = required(request.volume, "volume")?;

    state.controller.set_volume(&device_name, volume).await?;
    Ok(api_status("volume updated"))
}
