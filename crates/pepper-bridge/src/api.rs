//! API handlers for the bridge.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pepper_types::{BridgeStatus, SpeakRequest};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Parses an optional JSON body. An empty body is treated as `{}`.
fn parse_body(body: &Bytes) -> Result<SpeakRequest, ApiError> {
    if body.is_empty() {
        return Ok(SpeakRequest::default());
    }
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest("Invalid JSON".to_string()))
}

/// Handler for `GET /`.
pub async fn index_handler() -> Json<Value> {
    Json(json!({
        "name": "Pepper Bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /status": "Check connection status",
            "POST /speak": "Make Pepper speak (body: {text: string})",
            "POST /reconnect": "Reconnect to Pepper"
        }
    }))
}

/// Handler for `GET /status`.
pub async fn status_handler(Extension(state): Extension<Arc<AppState>>) -> Json<BridgeStatus> {
    Json(state.sessions.status().await)
}

/// Handler for `POST /speak`.
///
/// The text is forwarded verbatim; sanitizing it is the caller's job.
pub async fn speak_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = parse_body(&body)?;
    let text = match request.text {
        Some(text) if !text.is_empty() => text,
        _ => return Err(ApiError::BadRequest("No text provided".to_string())),
    };

    state
        .sessions
        .speak(&text)
        .await
        .map_err(|_| ApiError::InternalServerError("Failed to speak".to_string()))?;

    Ok(Json(json!({ "status": "ok", "spoken": true })))
}

/// Handler for `POST /reconnect`.
pub async fn reconnect_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    parse_body(&body)?;

    state
        .sessions
        .reconnect()
        .await
        .map_err(|_| ApiError::InternalServerError("Failed to connect".to_string()))?;

    Ok(Json(json!({ "status": "ok", "connected": true })))
}

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found_handler() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
