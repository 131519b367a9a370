//! HTTP response helper functions for consistent API responses.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;

/// Standard API success response with JSON data.
pub fn api_success<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(data))
}

/// Success response with a bare `{ "status": ... }` body.
pub fn api_status(status: &'static str) -> impl IntoResponse {
    api_success(json!({ "status": status }))
}
