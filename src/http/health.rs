use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, error};

use crate::models::health::HealthReport;
use crate::state::AppState;
use crate::upstream::UpstreamError;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// A missing or placeholder key is a normal outcome and still answers 200.
async fn health(State(state): State<AppState>) -> Response {
    match evaluate(&state) {
        Ok(report) => {
            debug!(ok = report.ok, "Helius health check");
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(err) => {
            error!("Helius health check failed: {err}");
            let report = HealthReport::failed(err.to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(report)).into_response()
        }
    }
}

fn evaluate(state: &AppState) -> Result<HealthReport, UpstreamError> {
    if !state.credentials.server_configured() {
        return Ok(HealthReport::not_configured());
    }
    state.upstream.check_endpoint()?;
    Ok(HealthReport::healthy())
}
