//! Explicit role change, reserved to super administrators.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::middleware::Actor;
use crate::user::{Role, UserRepository};
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Body {
    pub role: Role,
}

pub async fn handler(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
    Json(body): Json<Body>,
) -> Result<Json<Body>, ServerError> {
    if !state.config.is_super_admin(actor.id) {
        tracing::warn!(actor = actor.id, user_id, "role change refused");
        return Err(ServerError::Forbidden);
    }

    UserRepository::new(state.db.sqlite)
        .set_role(user_id, body.role)
        .await?;

    Ok(Json(body))
}
