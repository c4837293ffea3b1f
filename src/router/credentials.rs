//! Credential vault of the acting user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::credential::{Credential, CredentialService, NewCredential};
use crate::middleware::Actor;
use crate::router::Valid;
use crate::{AppState, ServerError};

fn vault(state: AppState) -> CredentialService {
    CredentialService::new(state.db.sqlite, Arc::clone(&state.crypto))
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Credential>>, ServerError> {
    Ok(Json(vault(state).list(actor.id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    actor: Actor,
    Valid(body): Valid<NewCredential>,
) -> Result<(StatusCode, Json<Credential>), ServerError> {
    let credential = vault(state).add(actor.id, &body).await?;

    Ok((StatusCode::CREATED, Json(credential)))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(credential_id): Path<i64>,
) -> Result<StatusCode, ServerError> {
    if vault(state).delete(actor.id, credential_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound("credential"))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use super::*;
    use crate::*;

    const ROUTE: &str = "/users/@me/credentials";

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_credentials_handlers(pool: SqlitePool) {
        let app = app(router::state(pool));

        let body = r#"{"service":"VPN","login":"ivanov","password":"s3cr3t!","url":"https://vpn.example.com"}"#;
        let response = make_request(Some(1001), app.clone(), Method::POST, ROUTE, body.into()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let created: Credential = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.owner, 1001);

        let body = r#"{"service":"VPN","password":"x","url":"not an url"}"#;
        let response = make_request(Some(1001), app.clone(), Method::POST, ROUTE, body.into()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            make_request(Some(1001), app.clone(), Method::GET, ROUTE, String::default()).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let listed: Vec<Credential> = serde_json::from_slice(&body).unwrap();
        assert_eq!(listed, [created.clone()]);
        assert_eq!(listed[0].password, "s3cr3t!");

        // Other users neither see nor delete it.
        let response =
            make_request(Some(1002), app.clone(), Method::GET, ROUTE, String::default()).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let listed: Vec<Credential> = serde_json::from_slice(&body).unwrap();
        assert!(listed.is_empty());

        let path = format!("{ROUTE}/{}", created.id);
        let response =
            make_request(Some(1002), app.clone(), Method::DELETE, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = make_request(Some(1001), app, Method::DELETE, &path, String::default()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
