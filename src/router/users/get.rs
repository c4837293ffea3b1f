//! Read a user and what belongs to it.

use axum::Json;
use axum::extract::{Path, State};

use crate::equipment::{Equipment, EquipmentRepository};
use crate::middleware::Actor;
use crate::ticket::{Ticket, TicketRepository};
use crate::user::{User, UserRepository};
use crate::{AppState, ServerError};

pub async fn handler(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, ServerError> {
    actor.check_owner_or_admin(user_id)?;

    UserRepository::new(state.db.sqlite)
        .find(user_id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("user"))
}

/// Tickets filed by a user, newest first.
pub async fn tickets(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Ticket>>, ServerError> {
    actor.check_owner_or_admin(user_id)?;

    Ok(Json(
        TicketRepository::new(state.db.sqlite)
            .list_for_owner(user_id)
            .await?,
    ))
}

/// Equipment currently held by a user.
pub async fn equipment(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Equipment>>, ServerError> {
    actor.check_owner_or_admin(user_id)?;

    Ok(Json(
        EquipmentRepository::new(state.db.sqlite)
            .by_holder(user_id)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use super::*;
    use crate::*;

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_get_user_handler(pool: SqlitePool) {
        let app = app(router::state(pool));

        let response =
            make_request(Some(1001), app.clone(), Method::GET, "/users/1001", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.login, "ivanov");

        // Someone else's profile.
        let response =
            make_request(Some(1002), app.clone(), Method::GET, "/users/1001", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Administrators see everyone.
        let response =
            make_request(Some(2001), app.clone(), Method::GET, "/users/1002", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response =
            make_request(Some(2001), app.clone(), Method::GET, "/users/4242", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = make_request(None, app, Method::GET, "/users/1001", String::default()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_user_tickets(pool: SqlitePool) {
        let app = app(router::state(pool));

        let body = r#"{"title":"No network","description":"Cable unplugged?","category":"Network"}"#;
        let response =
            make_request(Some(1001), app.clone(), Method::POST, "/tickets", body.into()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            Some(1001),
            app.clone(),
            Method::GET,
            "/users/1001/tickets",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let tickets: Vec<Ticket> = serde_json::from_slice(&body).unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].title, "No network");

        let response = make_request(
            Some(1002),
            app,
            Method::GET,
            "/users/1001/equipment",
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
