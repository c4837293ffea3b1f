use sqlx::SqlitePool;
use validator::Validate;

use crate::error::{Result, ServerError};
use crate::rating::check_rating;
use crate::telemetry;
use crate::ticket::{
    Attachment, HistoryEntry, NewTicket, RatingOutcome, Ticket, TicketRepository,
    TicketStatus,
};
use crate::workplace::{WorkplaceRepository, floor_from_hostname, floor_from_ip};

/// Ticket lifecycle manager.
///
/// Stateless between calls, the store holds every ticket.
#[derive(Clone)]
pub struct TicketService {
    pub repo: TicketRepository,
    pub workplaces: WorkplaceRepository,
}

impl TicketService {
    /// Create a new [`TicketService`].
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repo: TicketRepository::new(pool.clone()),
            workplaces: WorkplaceRepository::new(pool),
        }
    }

    /// Use another workplace directory, e.g. with a configured seed.
    pub fn with_workplaces(mut self, workplaces: WorkplaceRepository) -> Self {
        self.workplaces = workplaces;
        self
    }

    async fn ticket(&self, id: i64) -> Result<Ticket> {
        self.repo.find(id).await?.ok_or(ServerError::NotFound("ticket"))
    }

    /// Reject `from -> to` when the table forbids it.
    fn check_transition(id: i64, from: TicketStatus, to: TicketStatus) -> Result<()> {
        if from.can_transition_to(to) {
            return Ok(());
        }

        tracing::warn!(ticket_id = id, %from, %to, "transition rejected");
        Err(ServerError::InvalidTransition { from, to })
    }

    /// Fill missing floor and pc name from what is known about the place.
    async fn locate(&self, mut ticket: NewTicket) -> Result<NewTicket> {
        if let Some(number) = ticket.workplace.as_deref() {
            if let Some(workplace) = self.workplaces.find_by_number(number).await? {
                ticket.floor = ticket.floor.or(workplace.floor);
                ticket.pc_name = ticket.pc_name.or(workplace.primary_pc);
            }
        }

        if ticket.floor.is_none() {
            ticket.floor = match (ticket.ip.as_deref(), ticket.pc_name.as_deref()) {
                (Some(ip), hostname) => floor_from_ip(ip, hostname),
                (None, Some(hostname)) => floor_from_hostname(hostname),
                (None, None) => None,
            };
        }

        Ok(ticket)
    }

    /// File a new `open` ticket and return its id and number.
    pub async fn create(&self, owner: i64, ticket: NewTicket) -> Result<(i64, String)> {
        ticket.validate()?;
        let ticket = self.locate(ticket).await?;

        let (id, number) = self.repo.insert(owner, &ticket).await?;
        tracing::info!(ticket_id = id, %number, owner, "ticket created");

        Ok((id, number))
    }

    /// Claim an `open` ticket.
    ///
    /// At most one administrator wins, the others get a conflict.
    pub async fn assign(&self, id: i64, admin: i64) -> Result<()> {
        let ticket = self.ticket(id).await?;
        if ticket.status != TicketStatus::Open {
            return Err(ServerError::Conflict(format!(
                "ticket {} is not open",
                ticket.number
            )));
        }

        if !self.repo.claim(id, admin).await? {
            tracing::warn!(ticket_id = id, admin, "ticket claimed meanwhile");
            return Err(ServerError::Conflict(format!(
                "ticket {} is already claimed",
                ticket.number
            )));
        }

        tracing::info!(ticket_id = id, admin, "ticket assigned");
        telemetry::ticket_transition(TicketStatus::InProgress);
        Ok(())
    }

    /// Generic status move.
    ///
    /// `await_rating` and `closed` are reachable only through the rating
    /// flow.
    pub async fn change_status(
        &self,
        id: i64,
        status: TicketStatus,
        actor: i64,
        comment: Option<&str>,
    ) -> Result<TicketStatus> {
        let ticket = self.ticket(id).await?;

        if matches!(status, TicketStatus::AwaitRating | TicketStatus::Closed) {
            tracing::warn!(ticket_id = id, to = %status, "status reserved to the rating flow");
            return Err(ServerError::InvalidTransition {
                from: ticket.status,
                to: status,
            });
        }
        Self::check_transition(id, ticket.status, status)?;

        if !self
            .repo
            .set_status(id, ticket.status, status, actor, comment)
            .await?
        {
            return Err(ServerError::Conflict(format!(
                "ticket {} changed meanwhile",
                ticket.number
            )));
        }

        tracing::info!(ticket_id = id, from = %ticket.status, to = %status, actor, "ticket status changed");
        telemetry::ticket_transition(status);
        Ok(ticket.status)
    }

    /// Ask the owner for a rating.
    ///
    /// Returns the owner to prompt. A second call is rejected so the prompt
    /// is never sent twice.
    pub async fn close_for_rating(&self, id: i64, admin: i64) -> Result<i64> {
        let ticket = self.ticket(id).await?;
        Self::check_transition(id, ticket.status, TicketStatus::AwaitRating)?;

        let owner = self
            .repo
            .close_for_rating(id, ticket.status, admin)
            .await?
            .ok_or_else(|| {
                ServerError::Conflict(format!("ticket {} changed meanwhile", ticket.number))
            })?;

        tracing::info!(ticket_id = id, admin, owner, "ticket awaiting rating");
        telemetry::ticket_transition(TicketStatus::AwaitRating);
        Ok(owner)
    }

    /// Close a ticket with the owner's rating.
    ///
    /// The aggregator is not touched, forward the outcome to
    /// [`crate::rating::RatingRepository::record`].
    pub async fn finalize_rating(&self, id: i64, rating: i64) -> Result<RatingOutcome> {
        check_rating(rating)?;

        let ticket = self.ticket(id).await?;
        Self::check_transition(id, ticket.status, TicketStatus::Closed)?;

        if ticket.admin_id.is_none() {
            tracing::error!(ticket_id = id, "ticket was never assigned");
            return Err(ServerError::Conflict(format!(
                "ticket {} has no administrator",
                ticket.number
            )));
        }

        let outcome = self.repo.finalize(id, rating).await?.ok_or_else(|| {
            ServerError::Conflict(format!("ticket {} changed meanwhile", ticket.number))
        })?;

        tracing::info!(
            ticket_id = id,
            admin = outcome.administrator,
            rating,
            "ticket closed"
        );
        telemetry::ticket_transition(TicketStatus::Closed);
        Ok(outcome)
    }

    /// Status moves, oldest first.
    pub async fn history(&self, id: i64) -> Result<Vec<HistoryEntry>> {
        self.repo.history(id).await
    }

    /// Attach an opaque file reference.
    pub async fn attach(
        &self,
        id: i64,
        file_id: &str,
        file_type: &str,
        file_name: Option<&str>,
    ) -> Result<Attachment> {
        let attachment = self
            .repo
            .add_attachment(id, file_id, file_type, file_name)
            .await?
            .ok_or(ServerError::NotFound("ticket"))?;

        tracing::info!(ticket_id = id, attachment_id = attachment.id, "file attached");
        Ok(attachment)
    }
}
