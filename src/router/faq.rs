//! FAQ materials HTTP API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::faq::{Broadcast, FaqRepository, Material, NewMaterial};
use crate::middleware::{Actor, Admin};
use crate::router::Valid;
use crate::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{material_id}", get(handler).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<Material>>, ServerError> {
    Ok(Json(FaqRepository::new(state.db.sqlite).list().await?))
}

async fn handler(
    State(state): State<AppState>,
    _actor: Actor,
    Path(material_id): Path<i64>,
) -> Result<Json<Material>, ServerError> {
    FaqRepository::new(state.db.sqlite)
        .find(material_id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("material"))
}

/// Publish a material. The adapter delivers it to `recipients`.
async fn create(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Valid(body): Valid<NewMaterial>,
) -> Result<(StatusCode, Json<Broadcast>), ServerError> {
    let broadcast = FaqRepository::new(state.db.sqlite).create(admin.id, &body).await?;

    Ok((StatusCode::CREATED, Json(broadcast)))
}

async fn remove(
    State(state): State<AppState>,
    _admin: Admin,
    Path(material_id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    if FaqRepository::new(state.db.sqlite).delete(material_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound("material"))
    }
}
