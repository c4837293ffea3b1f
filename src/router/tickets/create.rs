//! File a ticket.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::middleware::Actor;
use crate::router::Valid;
use crate::ticket::NewTicket;
use crate::user::UserRepository;
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub id: i64,
    pub number: String,
    /// Administrators to notify.
    pub notify: Vec<i64>,
}

pub async fn handler(
    State(state): State<AppState>,
    actor: Actor,
    Valid(body): Valid<NewTicket>,
) -> Result<(StatusCode, Json<Response>), ServerError> {
    let (id, number) = super::service(&state).create(actor.id, body).await?;

    let notify = UserRepository::new(state.db.sqlite).admin_ids().await?;

    Ok((StatusCode::CREATED, Json(Response { id, number, notify })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use super::*;
    use crate::ticket::{TicketDetails, TicketNumber, TicketStatus};
    use crate::*;

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_create_ticket_handler(pool: SqlitePool) {
        let app = app(router::state(pool));

        let body = r#"{"title":"Printer jam","description":"Paper stuck in tray 2","category":"Hardware","priority":"high","pc_name":"TSS-WS-5012"}"#;
        let response = make_request(Some(1001), app.clone(), Method::POST, "/tickets", body.into()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let created: Response = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.notify, [2001, 2002]);
        let number: TicketNumber = created.number.parse().unwrap();
        assert_eq!(number.sequence, 1);

        let path = format!("/tickets/{}", created.id);
        let response = make_request(Some(1001), app.clone(), Method::GET, &path, String::default()).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let details: TicketDetails = serde_json::from_slice(&body).unwrap();
        assert_eq!(details.ticket.status, TicketStatus::Open);
        assert_eq!(details.ticket.floor, Some(5));
        assert_eq!(details.owner_name.as_deref(), Some("Ivan Ivanov"));

        // Unknown identities cannot file tickets.
        let body = r#"{"title":"x","description":"y","category":"z"}"#;
        let response = make_request(Some(4242), app.clone(), Method::POST, "/tickets", body.into()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = r#"{"title":"","description":"y","category":"z"}"#;
        let response = make_request(Some(1001), app, Method::POST, "/tickets", body.into()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
