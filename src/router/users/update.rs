//! Authorize or refresh an identity.

use axum::Json;
use axum::extract::{Path, State};

use crate::router::Valid;
use crate::user::{Profile, User, UserRepository};
use crate::{AppState, ServerError};

/// Called by the adapter once a user passed directory authentication, so no
/// actor is required.
pub async fn handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Valid(profile): Valid<Profile>,
) -> Result<Json<User>, ServerError> {
    let user = UserRepository::new(state.db.sqlite)
        .upsert(user_id, &profile)
        .await?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use super::*;
    use crate::user::Role;
    use crate::*;

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_update_user_handler(pool: SqlitePool) {
        let app = app(router::state(pool));

        let body = r#"{"login":"kuznetsov","full_name":"Petr Kuznetsov","department":"Sales"}"#;
        let response =
            make_request(None, app.clone(), Method::PUT, "/users/1003", body.into()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let user: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(user.id, 1003);
        assert_eq!(user.role, Role::User);

        // Administrators stay administrators on a new login.
        let body = r#"{"login":"sidorov","full_name":"Oleg Sidorov","position":"Head of IT"}"#;
        let response =
            make_request(None, app.clone(), Method::PUT, "/users/2001", body.into()).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let user: User = serde_json::from_slice(&body).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.position, "Head of IT");

        // Login owned by someone else.
        let body = r#"{"login":"ivanov","full_name":"Impostor"}"#;
        let response =
            make_request(None, app.clone(), Method::PUT, "/users/1004", body.into()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = r#"{"login":"","full_name":"Nobody"}"#;
        let response = make_request(None, app, Method::PUT, "/users/1005", body.into()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
