//! Administrator rating aggregator.
mod repository;

pub use repository::*;

use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Running total of an administrator, as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingRecord {
    pub user_id: i64,
    pub full_name: String,
    pub position: String,
    pub total_rating: i64,
    pub rating_count: i64,
}

impl RatingRecord {
    /// `total / count` rounded to two decimals, `0.0` without ratings.
    pub fn average(&self) -> f64 {
        if self.rating_count > 0 {
            let average = self.total_rating as f64 / self.rating_count as f64;
            (average * 100.0).round() / 100.0
        } else {
            0.0
        }
    }
}

/// Public view of an administrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdminInfo {
    pub id: i64,
    pub full_name: String,
    pub position: String,
    pub average: f64,
    pub ratings: i64,
}

impl From<RatingRecord> for AdminInfo {
    fn from(record: RatingRecord) -> Self {
        Self {
            average: record.average(),
            id: record.user_id,
            full_name: record.full_name,
            position: record.position,
            ratings: record.rating_count,
        }
    }
}

/// Reject ratings outside of `1..=5`.
pub fn check_rating(rating: i64) -> Result<(), ValidationErrors> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        return Ok(());
    }

    let mut errors = ValidationErrors::new();
    errors.add(
        "rating",
        ValidationError::new("range")
            .with_message("Rating must be between 1 and 5.".into()),
    );
    Err(errors)
}
