//! Handle database requests.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::database::{self, is_transient, is_unique_violation};
use crate::error::Result;
use crate::ticket::{
    Attachment, HistoryEntry, NewTicket, RatingOutcome, Ticket, TicketDetails,
    TicketFilter, TicketNumber, TicketStatus, MAX_SEQUENCE,
};
use crate::ServerError;

/// History comment of a claimed ticket.
pub const CLAIM_COMMENT: &str = "Administrator assigned, work started";

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

const DETAILS_QUERY: &str = r#"SELECT t.*,
        o.full_name AS owner_name,
        o.department AS owner_department,
        a.full_name AS admin_name
    FROM tickets t
    LEFT JOIN users o ON o.id = t.user_id
    LEFT JOIN users a ON a.id = t.admin_id"#;

/// One appended history row.
struct Change<'a> {
    ticket: i64,
    from: Option<TicketStatus>,
    to: TicketStatus,
    actor: Option<i64>,
    comment: Option<&'a str>,
    at: DateTime<Utc>,
}

/// Appends a history row, snapshotting the actor display name.
async fn append_history(
    conn: &mut SqliteConnection,
    change: Change<'_>,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO ticket_history (ticket_id, old_status, new_status, changed_by, changed_by_name, changed_at, comment)
            VALUES (?1, ?2, ?3, ?4, (SELECT full_name FROM users WHERE id = ?4), ?5, ?6)"#,
    )
    .bind(change.ticket)
    .bind(change.from)
    .bind(change.to)
    .bind(change.actor)
    .bind(change.at)
    .bind(change.comment)
    .execute(conn)
    .await?;

    Ok(())
}

#[derive(Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    /// Create a new [`TicketRepository`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new `open` ticket and return its id and number.
    ///
    /// The daily sequence is computed by the insert statement itself. Two
    /// concurrent inserts can still compute the same number; the unique
    /// index rejects one of them and it is tried again. Once the day reached
    /// [`MAX_SEQUENCE`] tickets, nothing is inserted and a conflict is
    /// returned.
    pub async fn insert(
        &self,
        owner: i64,
        ticket: &NewTicket,
    ) -> Result<(i64, String)> {
        let prefix = TicketNumber::today_prefix();
        let prefix = prefix.as_str();

        let created = database::retry(
            |err| is_unique_violation(err) || is_transient(err),
            move || async move {
                let now = Utc::now();
                let mut tx = self.pool.begin().await?;

                let created: Option<(i64, String)> = sqlx::query_as(
                    r#"INSERT INTO tickets (ticket_number, user_id, title, description, status, priority, category, floor, workplace, pc_name, created_at)
                        SELECT ?1 || printf('%04d', next.sequence),
                            ?3, ?4, ?5, 'open', ?6, ?7, ?8, ?9, ?10, ?11
                        FROM (
                            SELECT COALESCE(MAX(CAST(substr(ticket_number, ?2) AS INTEGER)), 0) + 1 AS sequence
                            FROM tickets
                            WHERE ticket_number LIKE ?1 || '%'
                        ) AS next
                        WHERE next.sequence <= ?12
                        RETURNING id, ticket_number"#,
                )
                .bind(prefix)
                .bind(prefix.len() as i64 + 1)
                .bind(owner)
                .bind(&ticket.title)
                .bind(&ticket.description)
                .bind(ticket.priority)
                .bind(&ticket.category)
                .bind(ticket.floor)
                .bind(&ticket.workplace)
                .bind(&ticket.pc_name)
                .bind(now)
                .bind(MAX_SEQUENCE)
                .fetch_optional(&mut *tx)
                .await?;

                let Some((id, number)) = created else {
                    return Ok::<_, sqlx::Error>(None);
                };

                append_history(
                    &mut tx,
                    Change {
                        ticket: id,
                        from: None,
                        to: TicketStatus::Open,
                        actor: Some(owner),
                        comment: None,
                        at: now,
                    },
                )
                .await?;

                tx.commit().await?;
                Ok(Some((id, number)))
            },
        )
        .await?;

        created.ok_or_else(|| {
            tracing::error!(%prefix, "daily ticket numbers exhausted");
            ServerError::Conflict("no ticket number left for today".into())
        })
    }

    /// Find a ticket using its surrogate id.
    pub async fn find(&self, id: i64) -> Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Find a ticket using its human readable number.
    pub async fn find_by_number(&self, number: &str) -> Result<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE ticket_number = ?",
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    /// Find a ticket with owner and administrator names.
    pub async fn details(&self, id: i64) -> Result<Option<TicketDetails>> {
        let details = sqlx::query_as::<_, TicketDetails>(&format!(
            "{DETAILS_QUERY} WHERE t.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(details)
    }

    /// List tickets newest first.
    pub async fn list(&self, filter: &TicketFilter) -> Result<Vec<TicketDetails>> {
        let mut query = QueryBuilder::<Sqlite>::new(DETAILS_QUERY);
        query.push(" WHERE 1 = 1");

        if let Some(status) = filter.status {
            query.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            query.push(" AND t.priority = ").push_bind(priority);
        }
        if let Some(department) = &filter.department {
            query.push(" AND o.department = ").push_bind(department.clone());
        }

        query
            .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT));

        let tickets = query
            .build_query_as::<TicketDetails>()
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Tickets filed by `owner`, newest first.
    pub async fn list_for_owner(&self, owner: i64) -> Result<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// `open -> in_progress` with `admin` as assignee.
    ///
    /// Returns `false` when the ticket was not `open` anymore.
    pub async fn claim(&self, id: i64, admin: i64) -> Result<bool> {
        let claimed = database::retry(is_transient, move || async move {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query(
                "UPDATE tickets SET admin_id = ?, status = 'in_progress' WHERE id = ? AND status = 'open'",
            )
            .bind(admin)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                return Ok(false);
            }

            append_history(
                &mut tx,
                Change {
                    ticket: id,
                    from: Some(TicketStatus::Open),
                    to: TicketStatus::InProgress,
                    actor: Some(admin),
                    comment: Some(CLAIM_COMMENT),
                    at: now,
                },
            )
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(true)
        })
        .await?;

        Ok(claimed)
    }

    /// Move from `from` to `to`.
    ///
    /// The actor becomes the assignee if the ticket had none. Returns
    /// `false` when the status was not `from` anymore.
    pub async fn set_status(
        &self,
        id: i64,
        from: TicketStatus,
        to: TicketStatus,
        actor: i64,
        comment: Option<&str>,
    ) -> Result<bool> {
        let changed = database::retry(is_transient, move || async move {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query(
                "UPDATE tickets SET status = ?, admin_id = COALESCE(admin_id, ?) WHERE id = ? AND status = ?",
            )
            .bind(to)
            .bind(actor)
            .bind(id)
            .bind(from)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                return Ok(false);
            }

            append_history(
                &mut tx,
                Change {
                    ticket: id,
                    from: Some(from),
                    to,
                    actor: Some(actor),
                    comment,
                    at: now,
                },
            )
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(true)
        })
        .await?;

        Ok(changed)
    }

    /// Move from `from` to `await_rating` and stamp the closing time.
    ///
    /// Returns the owner, or `None` when the status was not `from` anymore.
    pub async fn close_for_rating(
        &self,
        id: i64,
        from: TicketStatus,
        admin: i64,
    ) -> Result<Option<i64>> {
        let owner = database::retry(is_transient, move || async move {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;

            let owner: Option<i64> = sqlx::query_scalar(
                r#"UPDATE tickets SET status = 'await_rating', admin_id = ?, closed_at = ?
                    WHERE id = ? AND status = ?
                    RETURNING user_id"#,
            )
            .bind(admin)
            .bind(now)
            .bind(id)
            .bind(from)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(owner) = owner else {
                return Ok(None);
            };

            append_history(
                &mut tx,
                Change {
                    ticket: id,
                    from: Some(from),
                    to: TicketStatus::AwaitRating,
                    actor: Some(admin),
                    comment: None,
                    at: now,
                },
            )
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(owner))
        })
        .await?;

        Ok(owner)
    }

    /// `await_rating -> closed` with the owner's rating.
    ///
    /// Returns `None` if the ticket is not awaiting a rating or has no
    /// assignee.
    pub async fn finalize(&self, id: i64, rating: i64) -> Result<Option<RatingOutcome>> {
        let outcome = database::retry(is_transient, move || async move {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;

            let row: Option<(i64, String, i64)> = sqlx::query_as(
                r#"UPDATE tickets SET status = 'closed', rating = ?
                    WHERE id = ? AND status = 'await_rating' AND admin_id IS NOT NULL
                    RETURNING admin_id, ticket_number, user_id"#,
            )
            .bind(rating)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            let Some((administrator, ticket_number, owner)) = row else {
                return Ok(None);
            };

            append_history(
                &mut tx,
                Change {
                    ticket: id,
                    from: Some(TicketStatus::AwaitRating),
                    to: TicketStatus::Closed,
                    actor: Some(owner),
                    comment: None,
                    at: now,
                },
            )
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(RatingOutcome {
                administrator,
                ticket_number,
                owner,
                rating,
            }))
        })
        .await?;

        Ok(outcome)
    }

    /// Status moves of a ticket, oldest first.
    pub async fn history(&self, id: i64) -> Result<Vec<HistoryEntry>> {
        let entries = sqlx::query_as::<_, HistoryEntry>(
            r#"SELECT th.id, th.old_status, th.new_status, th.changed_by,
                    COALESCE(u.full_name, th.changed_by_name, 'system') AS changed_by_name,
                    th.changed_at, th.comment
                FROM ticket_history th
                LEFT JOIN users u ON u.id = th.changed_by
                WHERE th.ticket_id = ?
                ORDER BY th.changed_at, th.id"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Keep a file reference next to a ticket.
    ///
    /// Returns `None` when the ticket does not exist.
    pub async fn add_attachment(
        &self,
        ticket: i64,
        file_id: &str,
        file_type: &str,
        file_name: Option<&str>,
    ) -> Result<Option<Attachment>> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"INSERT INTO ticket_attachments (ticket_id, file_id, file_type, file_name, created_at)
                SELECT id, ?, ?, ?, ? FROM tickets WHERE id = ?
                RETURNING *"#,
        )
        .bind(file_id)
        .bind(file_type)
        .bind(file_name)
        .bind(Utc::now())
        .bind(ticket)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attachment)
    }

    /// Files attached to a ticket, oldest first.
    pub async fn attachments(&self, ticket: i64) -> Result<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM ticket_attachments WHERE ticket_id = ? ORDER BY created_at, id",
        )
        .bind(ticket)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }
}
