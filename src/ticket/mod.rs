//! Ticket lifecycle engine.
//!
//! A ticket moves `open -> in_progress -> await_rating -> closed`, with
//! `on_hold` as a parking state. Every move goes through
//! [`TicketStatus::can_transition_to`] and leaves one history row behind.
mod number;
mod repository;
mod service;

pub use number::*;
pub use repository::*;
pub use service::*;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Status of a [`Ticket`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    OnHold,
    AwaitRating,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 5] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::OnHold,
        TicketStatus::AwaitRating,
        TicketStatus::Closed,
    ];

    /// Whether a ticket in `self` may move to `next`.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;

        matches!(
            (self, next),
            (Open, InProgress | OnHold | AwaitRating)
                | (InProgress, OnHold | AwaitRating)
                | (OnHold, Open | InProgress | AwaitRating)
                | (AwaitRating, InProgress | OnHold | Closed)
        )
    }

    /// `closed` accepts no further move.
    pub fn is_terminal(self) -> bool {
        self == TicketStatus::Closed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::OnHold => "on_hold",
            TicketStatus::AwaitRating => "await_rating",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown ticket status `{s}`"))
    }
}

/// Urgency picked by the owner.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Ticket as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: i64,
    #[sqlx(rename = "ticket_number")]
    pub number: String,
    #[sqlx(rename = "user_id")]
    pub owner_id: i64,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub category: String,
    pub admin_id: Option<i64>,
    pub rating: Option<i64>,
    pub floor: Option<i64>,
    pub workplace: Option<String>,
    pub pc_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// [`Ticket`] joined with display names of the people around it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ticket: Ticket,
    pub owner_name: Option<String>,
    pub owner_department: Option<String>,
    pub admin_name: Option<String>,
}

/// Finalized ticket dialog.
///
/// The chat layer collects fields step by step and submits them once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewTicket {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters long."))]
    pub title: String,
    #[validate(length(min = 1, max = 4000, message = "Description must be 1 to 4000 characters long."))]
    pub description: String,
    #[validate(length(min = 1, max = 100, message = "Category must be 1 to 100 characters long."))]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    pub floor: Option<i64>,
    pub workplace: Option<String>,
    pub pc_name: Option<String>,
    /// Address of the reporting machine, only used to guess the floor.
    #[serde(default, skip_serializing)]
    pub ip: Option<String>,
}

/// One status move of a ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub old_status: Option<TicketStatus>,
    pub new_status: TicketStatus,
    pub changed_by: Option<i64>,
    /// Actor display name, `system` when unknown.
    pub changed_by_name: String,
    pub changed_at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Opaque file reference kept alongside a ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: i64,
    pub ticket_id: i64,
    pub file_id: String,
    pub file_type: String,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload handed back once the owner rated a ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingOutcome {
    pub administrator: i64,
    pub ticket_number: String,
    pub owner: i64,
    pub rating: i64,
}

/// Filters of the administrator ticket list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub department: Option<String>,
    pub limit: Option<i64>,
}
