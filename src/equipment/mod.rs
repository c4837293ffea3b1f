//! Equipment assignment ledger.
//!
//! An item is either `available` or `assigned` to exactly one holder. Every
//! reassignment, the first one included, appends a history row that
//! outlives the item itself.
mod inventory;
mod repository;

pub use inventory::*;
pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EquipmentStatus {
    #[default]
    Available,
    Assigned,
}

/// Equipment as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Equipment {
    pub id: i64,
    #[sqlx(rename = "inv_number")]
    pub inventory: String,
    pub model: String,
    pub serial: String,
    pub category: String,
    pub status: EquipmentStatus,
    #[sqlx(rename = "user_id")]
    pub holder_id: Option<i64>,
    pub workplace_id: Option<i64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewEquipment {
    /// Generated from the category when missing.
    #[validate(
        length(min = 1, max = 50, message = "Inventory number must be 1 to 50 characters long."),
        custom(function = "not_blank", message = "Inventory number cannot be blank.")
    )]
    pub inventory: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Model must be 1 to 200 characters long."))]
    pub model: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub serial: String,
    #[validate(length(min = 1, max = 50, message = "Category must be 1 to 50 characters long."))]
    pub category: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }

    Ok(())
}

/// One reassignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EquipmentHistoryEntry {
    pub id: i64,
    pub equipment_id: i64,
    #[sqlx(rename = "inv_number")]
    pub inventory: String,
    #[sqlx(rename = "from_user_id")]
    pub from_user: Option<i64>,
    pub from_name: Option<String>,
    #[sqlx(rename = "to_user_id")]
    pub to_user: i64,
    pub to_name: Option<String>,
    pub assigned_by: i64,
    pub assigned_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentFilter {
    pub status: Option<EquipmentStatus>,
    pub holder: Option<i64>,
    pub workplace: Option<i64>,
}
