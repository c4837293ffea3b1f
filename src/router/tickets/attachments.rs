//! File references kept next to a ticket.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::middleware::Actor;
use crate::router::Valid;
use crate::ticket::Attachment;
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(min = 1, max = 500))]
    pub file_id: String,
    #[validate(length(min = 1, max = 50))]
    pub file_type: String,
    #[validate(length(max = 255))]
    pub file_name: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Vec<Attachment>>, ServerError> {
    let service = super::service(&state);
    super::visible_ticket(&service, actor, ticket_id).await?;

    Ok(Json(service.repo.attachments(ticket_id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<i64>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Attachment>), ServerError> {
    let service = super::service(&state);
    super::visible_ticket(&service, actor, ticket_id).await?;

    let attachment = service
        .attach(ticket_id, &body.file_id, &body.file_type, body.file_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(attachment)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use sqlx::SqlitePool;

    use super::*;
    use crate::ticket::{NewTicket, TicketService};
    use crate::*;

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_attachments_handlers(pool: SqlitePool) {
        let (id, _) = TicketService::new(pool.clone())
            .create(
                1001,
                NewTicket {
                    title: "Blue screen".into(),
                    description: "See photo".into(),
                    category: "Software".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let app = app(router::state(pool));
        let path = format!("/tickets/{id}/attachments");

        let body = r#"{"file_id":"AgACAgIAAxkBAAIB","file_type":"photo","file_name":"bsod.jpg"}"#;
        let response = make_request(Some(1002), app.clone(), Method::POST, &path, body.into()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = make_request(Some(1001), app.clone(), Method::POST, &path, body.into()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(Some(2001), app.clone(), Method::GET, &path, String::default()).await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let attachments: Vec<Attachment> = serde_json::from_slice(&body).unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].file_name.as_deref(), Some("bsod.jpg"));

        let response = make_request(
            Some(2001),
            app,
            Method::POST,
            "/tickets/999999/attachments",
            r#"{"file_id":"x","file_type":"document"}"#.into(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
