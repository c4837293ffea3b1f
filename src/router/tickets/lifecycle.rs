//! Ticket state changes.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::middleware::{Actor, Admin};
use crate::rating::{AdminInfo, RatingRepository};
use crate::router::Valid;
use crate::ticket::{RatingOutcome, Ticket, TicketStatus};
use crate::{AppState, ServerError};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct StatusBody {
    pub status: TicketStatus,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Result of a status change.
#[derive(Debug, Serialize, Deserialize)]
pub struct Moved {
    pub previous: TicketStatus,
    pub ticket: Ticket,
}

/// Owner to prompt for a rating.
#[derive(Debug, Serialize, Deserialize)]
pub struct Prompt {
    pub owner: i64,
    pub ticket_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RatingBody {
    pub rating: i64,
}

/// Closed ticket and the administrator's updated standing.
///
/// `admin` is `None` when the aggregator refused the rating.
#[derive(Debug, Serialize, Deserialize)]
pub struct Rated {
    pub outcome: RatingOutcome,
    pub admin: Option<AdminInfo>,
}

async fn reload(state: &AppState, ticket_id: i64) -> Result<Ticket, ServerError> {
    super::service(state)
        .repo
        .find(ticket_id)
        .await?
        .ok_or(ServerError::NotFound("ticket"))
}

/// Claim an `open` ticket for the acting administrator.
pub async fn assign(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Ticket>, ServerError> {
    super::service(&state).assign(ticket_id, admin.id).await?;

    Ok(Json(reload(&state, ticket_id).await?))
}

pub async fn status(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Path(ticket_id): Path<i64>,
    Valid(body): Valid<StatusBody>,
) -> Result<Json<Moved>, ServerError> {
    let previous = super::service(&state)
        .change_status(ticket_id, body.status, admin.id, body.comment.as_deref())
        .await?;

    Ok(Json(Moved {
        previous,
        ticket: reload(&state, ticket_id).await?,
    }))
}

/// Done on the administrator side, ask the owner for a rating.
pub async fn close(
    State(state): State<AppState>,
    Admin(admin): Admin,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Prompt>, ServerError> {
    let service = super::service(&state);
    let owner = service.close_for_rating(ticket_id, admin.id).await?;
    let ticket = reload(&state, ticket_id).await?;

    Ok(Json(Prompt {
        owner,
        ticket_number: ticket.number,
    }))
}

/// Owner's rating. Closes the ticket, then feeds the aggregator.
pub async fn rating(
    State(state): State<AppState>,
    actor: Actor,
    Path(ticket_id): Path<i64>,
    Json(body): Json<RatingBody>,
) -> Result<Json<Rated>, ServerError> {
    let ticket = reload(&state, ticket_id).await?;
    if ticket.owner_id != actor.id {
        tracing::warn!(ticket_id, actor = actor.id, "rating from someone else than the owner");
        return Err(ServerError::Forbidden);
    }

    let outcome = super::service(&state)
        .finalize_rating(ticket_id, body.rating)
        .await?;

    // The closure stands even when the aggregator refuses the rating.
    let admin = RatingRepository::new(state.db.sqlite)
        .record(outcome.administrator, outcome.rating)
        .await
        .inspect_err(|err| {
            tracing::error!(
                ticket_id,
                admin = outcome.administrator,
                error = %err,
                "rating not recorded"
            )
        })
        .ok();

    Ok(Json(Rated { outcome, admin }))
}
