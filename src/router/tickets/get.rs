//! Read tickets.

use axum::Json;
use axum::extract::{Path, Query, State};

use crate::middleware::{Actor, Admin};
use crate::ticket::{HistoryEntry, Ticket, TicketDetails, TicketFilter};
use crate::{AppState, ServerError};

/// Administrator queue, newest first.
pub async fn list(
    State(state): State<AppState>,
    _admin: Admin,
    Query(filter): Query<TicketFilter>,
) -> Result<Json<Vec<TicketDetails>>, ServerError> {
    Ok(Json(super::service(&state).repo.list(&filter).await?))
}

pub async fn handler(
    State(state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<i64>,
) -> Result<Json<TicketDetails>, ServerError> {
    let service = super::service(&state);
    super::visible_ticket(&service, actor, ticket_id).await?;

    service
        .repo
        .details(ticket_id)
        .await?
        .map(Json)
        .ok_or(ServerError::NotFound("ticket"))
}

/// Lookup by `TK<YYMMDD><NNNN>`.
pub async fn by_number(
    State(state): State<AppState>,
    actor: Actor,
    Path(number): Path<String>,
) -> Result<Json<Ticket>, ServerError> {
    let ticket = super::service(&state)
        .repo
        .find_by_number(&number)
        .await?
        .ok_or(ServerError::NotFound("ticket"))?;
    actor.check_owner_or_admin(ticket.owner_id)?;

    Ok(Json(ticket))
}

pub async fn history(
    State(state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Vec<HistoryEntry>>, ServerError> {
    let service = super::service(&state);
    super::visible_ticket(&service, actor, ticket_id).await?;

    Ok(Json(service.history(ticket_id).await?))
}
