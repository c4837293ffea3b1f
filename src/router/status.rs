//! Public service status and Prometheus scrape endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Structured status.
#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub version: String,
    pub name: String,
    pub store: bool,
}

/// Public server status.
pub async fn status(State(state): State<AppState>) -> Json<Status> {
    let store = sqlx::query("SELECT 1")
        .execute(&state.db.sqlite)
        .await
        .inspect_err(|err| tracing::error!(error = %err, "store unreachable"))
        .is_ok();

    Json(Status {
        version: env!("CARGO_PKG_VERSION").into(),
        name: state.config.name.clone(),
        store,
    })
}

/// Render Prometheus metrics, `404` when disabled.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
