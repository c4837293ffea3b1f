//! Tickets-related HTTP API.
mod attachments;
mod create;
mod get;
mod lifecycle;

use axum::Router;
use axum::routing::{get, post};

use crate::AppState;
use crate::error::Result;
use crate::middleware::Actor;
use crate::ticket::{Ticket, TicketService};

pub fn router() -> Router<AppState> {
    Router::new()
        // `POST /tickets` goes to `create`, `GET /tickets` to `get::list`.
        .route("/", post(create::handler).get(get::list))
        .route("/number/{number}", get(get::by_number))
        .route("/{ticket_id}", get(get::handler))
        .route("/{ticket_id}/history", get(get::history))
        .route("/{ticket_id}/assign", post(lifecycle::assign))
        .route("/{ticket_id}/status", post(lifecycle::status))
        .route("/{ticket_id}/close", post(lifecycle::close))
        .route("/{ticket_id}/rating", post(lifecycle::rating))
        .route(
            "/{ticket_id}/attachments",
            get(attachments::list).post(attachments::add),
        )
}

/// Ticket service wired with the configured workplace seed.
fn service(state: &AppState) -> TicketService {
    let service = TicketService::new(state.db.sqlite.clone());
    let workplaces = service
        .workplaces
        .clone()
        .with_seed(state.config.workplaces.clone());

    service.with_workplaces(workplaces)
}

/// Load a ticket visible to `actor`: its owner or any administrator.
async fn visible_ticket(service: &TicketService, actor: Actor, id: i64) -> Result<Ticket> {
    let ticket = service
        .repo
        .find(id)
        .await?
        .ok_or(crate::ServerError::NotFound("ticket"))?;
    actor.check_owner_or_admin(ticket.owner_id)?;

    Ok(ticket)
}
