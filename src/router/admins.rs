//! Administrator registry and statistics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::middleware::Actor;
use crate::rating::{AdminInfo, RatingRepository};
use crate::router::Valid;
use crate::user::UserRepository;
use crate::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(register))
        .route("/{admin_id}", get(info))
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct Body {
    pub id: i64,
    /// Taken from the directory when missing.
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(max = 200))]
    pub position: Option<String>,
}

async fn register(
    State(state): State<AppState>,
    actor: Actor,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<AdminInfo>), ServerError> {
    if !state.config.is_super_admin(actor.id) {
        tracing::warn!(actor = actor.id, "administrator registration refused");
        return Err(ServerError::Forbidden);
    }

    let user = UserRepository::new(state.db.sqlite.clone())
        .find(body.id)
        .await?
        .ok_or(ServerError::NotFound("user"))?;

    let info = RatingRepository::new(state.db.sqlite)
        .register(
            user.id,
            body.full_name.as_deref().unwrap_or(&user.full_name),
            body.position.as_deref().unwrap_or(&user.position),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(info)))
}

async fn list(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<AdminInfo>>, ServerError> {
    Ok(Json(RatingRepository::new(state.db.sqlite).list().await?))
}

async fn info(
    State(state): State<AppState>,
    _actor: Actor,
    Path(admin_id): Path<i64>,
) -> Result<Json<AdminInfo>, ServerError> {
    RatingRepository::new(state.db.sqlite)
        .info(admin_id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("administrator"))
}
