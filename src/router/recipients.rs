//! Notification lists for the adapter.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::middleware::Actor;
use crate::user::UserRepository;
use crate::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admins", get(admins))
        .route("/all", get(all))
}

/// Who hears about new tickets.
async fn admins(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<i64>>, ServerError> {
    Ok(Json(UserRepository::new(state.db.sqlite).admin_ids().await?))
}

/// Broadcast snapshot.
async fn all(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<i64>>, ServerError> {
    Ok(Json(UserRepository::new(state.db.sqlite).all_ids().await?))
}
