//! Workplace directory HTTP API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::equipment::Equipment;
use crate::middleware::{Actor, Admin};
use crate::router::Valid;
use crate::workplace::{NewWorkplace, Workplace, WorkplaceRepository};
use crate::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/floors", get(floors))
        .route("/floors/{floor}", get(by_floor))
        .route("/{number}", get(handler).delete(delete))
        .route("/{number}/equipment", get(equipment))
}

fn directory(state: &AppState) -> WorkplaceRepository {
    WorkplaceRepository::new(state.db.sqlite.clone()).with_seed(state.config.workplaces.clone())
}

async fn list(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<Workplace>>, ServerError> {
    Ok(Json(directory(&state).list().await?))
}

async fn floors(
    State(state): State<AppState>,
    _actor: Actor,
) -> Result<Json<Vec<i64>>, ServerError> {
    let directory = directory(&state);
    directory.seed_if_empty().await?;

    Ok(Json(directory.floors().await?))
}

async fn by_floor(
    State(state): State<AppState>,
    _actor: Actor,
    Path(floor): Path<i64>,
) -> Result<Json<Vec<Workplace>>, ServerError> {
    Ok(Json(directory(&state).by_floor(floor).await?))
}

async fn handler(
    State(state): State<AppState>,
    _actor: Actor,
    Path(number): Path<String>,
) -> Result<Json<Workplace>, ServerError> {
    directory(&state)
        .find_by_number(&number)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("workplace"))
}

async fn equipment(
    State(state): State<AppState>,
    _actor: Actor,
    Path(number): Path<String>,
) -> Result<Json<Vec<Equipment>>, ServerError> {
    directory(&state)
        .equipment(&number)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("workplace"))
}

async fn create(
    State(state): State<AppState>,
    _admin: Admin,
    Valid(body): Valid<NewWorkplace>,
) -> Result<(StatusCode, Json<Workplace>), ServerError> {
    let workplace = directory(&state).create(&body).await?;

    Ok((StatusCode::CREATED, Json(workplace)))
}

async fn delete(
    State(state): State<AppState>,
    _admin: Admin,
    Path(number): Path<String>,
) -> Result<StatusCode, ServerError> {
    if directory(&state).delete(&number).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound("workplace"))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use super::*;
    use crate::*;

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_floor_dialog(pool: SqlitePool) {
        let app = app(router::state(pool));

        let response =
            make_request(Some(1001), app.clone(), Method::GET, "/workplaces/floors", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let floors: Vec<i64> = serde_json::from_slice(&body).unwrap();
        assert_eq!(floors, [2, 4, 5]);

        let response = make_request(
            Some(1001),
            app.clone(),
            Method::GET,
            "/workplaces/floors/5",
            String::default(),
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let workplaces: Vec<Workplace> = serde_json::from_slice(&body).unwrap();
        let numbers: Vec<_> = workplaces.iter().map(|w| w.number.as_str()).collect();
        assert_eq!(numbers, ["501", "502", "503"]);

        let response =
            make_request(Some(1001), app.clone(), Method::GET, "/workplaces/502", String::default())
                .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let workplace: Workplace = serde_json::from_slice(&body).unwrap();
        assert_eq!(workplace.primary_pc.as_deref(), Some("TSS-WS-5002"));

        let response =
            make_request(Some(1001), app, Method::GET, "/workplaces/999/equipment", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_manage_workplaces(pool: SqlitePool) {
        let app = app(router::state(pool));
        let body = r#"{"number":"701","department":"Accounting","floor":7,"primary_pc":"TSS-WS-7001"}"#;

        let response =
            make_request(Some(1001), app.clone(), Method::POST, "/workplaces", body.into()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response =
            make_request(Some(2001), app.clone(), Method::POST, "/workplaces", body.into()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response =
            make_request(Some(2001), app.clone(), Method::POST, "/workplaces", body.into()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response =
            make_request(Some(2001), app.clone(), Method::DELETE, "/workplaces/701", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response =
            make_request(Some(2001), app, Method::GET, "/workplaces/701", String::default()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
