mod repository;

pub use repository::*;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// User as saved on database.
///
/// `id` is the opaque chat platform identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub full_name: String,
    pub department: String,
    pub position: String,
    pub role: Role,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Profile received after a successful authentication.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    #[validate(length(min = 1, max = 100, message = "Login must be 1 to 100 characters long."))]
    pub login: String,
    #[validate(length(min = 1, max = 200, message = "Full name must be 1 to 200 characters long."))]
    pub full_name: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub department: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub position: String,
    #[validate(email(message = "Email must be formated."))]
    pub email: Option<String>,
}
