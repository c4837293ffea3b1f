//! Equipment-related HTTP API.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::equipment::{
    Equipment, EquipmentFilter, EquipmentHistoryEntry, EquipmentRepository, NewEquipment,
};
use crate::middleware::{Actor, Admin};
use crate::router::Valid;
use crate::user::UserRepository;
use crate::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{inventory}", get(handler).delete(delete))
        .route("/{inventory}/assign", post(assign))
        .route("/{inventory}/workplace", put(place))
        .route("/{inventory}/history", get(history))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AssignBody {
    pub holder: i64,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceBody {
    /// Workplace number, `null` to clear.
    pub workplace: Option<String>,
}

async fn item(repo: &EquipmentRepository, inventory: &str) -> Result<Equipment, ServerError> {
    repo.find_by_inventory(inventory)
        .await?
        .ok_or(ServerError::NotFound("equipment"))
}

async fn create(
    State(state): State<AppState>,
    _admin: Admin,
    Valid(body): Valid<NewEquipment>,
) -> Result<(StatusCode, Json<Equipment>), ServerError> {
    let equipment = EquipmentRepository::new(state.db.sqlite).create(&body).await?;

    Ok((StatusCode::CREATED, Json(equipment)))
}

async fn list(
    State(state): State<AppState>,
    _admin: Admin,
    Query(filter): Query<EquipmentFilter>,
) -> Result<Json<Vec<Equipment>>, ServerError> {
    Ok(Json(EquipmentRepository::new(state.db.sqlite).list(&filter).await?))
}

/// Visible to the holder and administrators.
async fn handler(
    State(state): State<AppState>,
    actor: Actor,
    Path(inventory): Path<String>,
) -> Result<Json<Equipment>, ServerError> {
    let equipment = item(&EquipmentRepository::new(state.db.sqlite), &inventory).await?;

    if !actor.is_admin() && equipment.holder_id != Some(actor.id) {
        return Err(ServerError::Forbidden);
    }

    Ok(Json(equipment))
}

async fn delete(
    State(state): State<AppState>,
    _admin: Admin,
    Path(inventory): Path<String>,
) -> Result<StatusCode, ServerError> {
    if EquipmentRepository::new(state.db.sqlite).delete(&inventory).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound("equipment"))
    }
}

async fn assign(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Path(inventory): Path<String>,
    Valid(body): Valid<AssignBody>,
) -> Result<Json<Equipment>, ServerError> {
    if UserRepository::new(state.db.sqlite.clone())
        .find(body.holder)
        .await?
        .is_none()
    {
        return Err(ServerError::NotFound("user"));
    }

    let repo = EquipmentRepository::new(state.db.sqlite);
    let equipment = item(&repo, &inventory).await?;

    let assigned = repo
        .assign(equipment.id, body.holder, admin.id, body.reason.as_deref())
        .await?;

    Ok(Json(assigned))
}

async fn place(
    State(state): State<AppState>,
    _admin: Admin,
    Path(inventory): Path<String>,
    Json(body): Json<PlaceBody>,
) -> Result<Json<Equipment>, ServerError> {
    let equipment = EquipmentRepository::new(state.db.sqlite)
        .place(&inventory, body.workplace.as_deref())
        .await?;

    Ok(Json(equipment))
}

async fn history(
    State(state): State<AppState>,
    _admin: Admin,
    Path(inventory): Path<String>,
) -> Result<Json<Vec<EquipmentHistoryEntry>>, ServerError> {
    let repo = EquipmentRepository::new(state.db.sqlite);
    let equipment = item(&repo, &inventory).await?;

    Ok(Json(repo.history(equipment.id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use super::*;
    use crate::equipment::{EquipmentStatus, current_inventory_prefix};
    use crate::*;

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_equipment_handlers(pool: SqlitePool) {
        let app = app(router::state(pool));

        let body = r#"{"model":"ThinkPad T14","serial":"PF-3XK2","category":"laptop"}"#;
        let response =
            make_request(Some(1001), app.clone(), Method::POST, "/equipment", body.into()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response =
            make_request(Some(2001), app.clone(), Method::POST, "/equipment", body.into()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let laptop: Equipment = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            laptop.inventory,
            format!("{}0001", current_inventory_prefix("laptop"))
        );

        let body = r#"{"inventory":"MN-0042","model":"Dell P2422H","category":"monitor"}"#;
        let response =
            make_request(Some(2001), app.clone(), Method::POST, "/equipment", body.into()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response =
            make_request(Some(2001), app.clone(), Method::POST, "/equipment", body.into()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let base = format!("/equipment/{}", laptop.inventory);

        // Not held yet, only administrators see it.
        let response = make_request(Some(1001), app.clone(), Method::GET, &base, String::default()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        for holder in [1001, 1002] {
            let body = format!(r#"{{"holder":{holder},"reason":"onboarding"}}"#);
            let response =
                make_request(Some(2001), app.clone(), Method::POST, &format!("{base}/assign"), body)
                    .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = make_request(Some(1002), app.clone(), Method::GET, &base, String::default()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let laptop: Equipment = serde_json::from_slice(&body).unwrap();
        assert_eq!(laptop.status, EquipmentStatus::Assigned);
        assert_eq!(laptop.holder_id, Some(1002));

        let response = make_request(
            Some(2001),
            app.clone(),
            Method::GET,
            &format!("{base}/history"),
            String::default(),
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let history: Vec<EquipmentHistoryEntry> = serde_json::from_slice(&body).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from_user, None);
        assert_eq!(history[1].from_user, Some(1001));
        assert_eq!(history[1].to_name.as_deref(), Some("Anna Petrova"));

        let response = make_request(
            Some(2001),
            app.clone(),
            Method::GET,
            "/equipment?status=assigned",
            String::default(),
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let assigned: Vec<Equipment> = serde_json::from_slice(&body).unwrap();
        assert_eq!(assigned.len(), 1);

        let response = make_request(
            Some(2001),
            app.clone(),
            Method::POST,
            &format!("{base}/assign"),
            r#"{"holder":4242}"#.into(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            make_request(Some(2001), app.clone(), Method::DELETE, &base, String::default()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = make_request(Some(2001), app, Method::DELETE, &base, String::default()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_place_equipment(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool.clone());
        repo.create(&NewEquipment {
            inventory: Some("PR-0007".into()),
            model: "HP LaserJet".into(),
            category: "printer".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        let app = app(router::state(pool));

        // The directory is seeded lazily by floor queries.
        let response =
            make_request(Some(1001), app.clone(), Method::GET, "/workplaces/floors/4", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            Some(2001),
            app.clone(),
            Method::PUT,
            "/equipment/PR-0007/workplace",
            r#"{"workplace":"401"}"#.into(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            Some(1001),
            app.clone(),
            Method::GET,
            "/workplaces/401/equipment",
            String::default(),
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let placed: Vec<Equipment> = serde_json::from_slice(&body).unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].inventory, "PR-0007");

        let response = make_request(
            Some(2001),
            app,
            Method::PUT,
            "/equipment/PR-0007/workplace",
            r#"{"workplace":"999"}"#.into(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
