use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::models::health::NOT_CONFIGURED_MESSAGE;
use crate::state::AppState;

use super::HttpError;

/// Real upstream status; the response status itself collapses to 200/500.
pub const UPSTREAM_STATUS_HEADER: HeaderName = HeaderName::from_static("x-upstream-status");

pub fn router() -> Router<AppState> {
    Router::new().route("/proxy", post(forward))
}

async fn forward(State(state): State<AppState>, body: Bytes) -> Result<Response, HttpError> {
    let request: Value = serde_json::from_slice(&body).map_err(|err| {
        HttpError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Invalid JSON request body: {err}"),
        )
    })?;

    let credential = state.credentials.server_credential().ok_or_else(|| {
        HttpError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            NOT_CONFIGURED_MESSAGE.to_string(),
        )
    })?;

    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("<none>");
    debug!(method, "Forwarding DAS request");

    let reply = state
        .upstream
        .forward(&request, credential)
        .await
        .map_err(|err| {
            let message = credential.scrub(&err.to_string());
            error!(method, "Helius proxy failed: {message}");
            HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        })?;

    let status = if reply.status.is_success() {
        StatusCode::OK
    } else {
        warn!(
            method,
            upstream_status = reply.status.as_u16(),
            "Helius returned a non-success status"
        );
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let mut response = (status, Json(reply.body)).into_response();
    response.headers_mut().insert(
        UPSTREAM_STATUS_HEADER,
        HeaderValue::from(reply.status.as_u16()),
    );
    Ok(response)
}
