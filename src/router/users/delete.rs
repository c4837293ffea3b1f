//! Revoke an authorization.

use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::middleware::Admin;
use crate::user::UserRepository;
use crate::{AppState, ServerError};

pub async fn handler(
    State(state): State<AppState>,
    Admin(actor): Admin,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    if !UserRepository::new(state.db.sqlite).remove(user_id).await? {
        return Err(ServerError::NotFound("user"));
    }

    tracing::info!(user_id, admin = actor.id, "authorization revoked");

    Ok(StatusCode::NO_CONTENT)
}
