//! Per-user vault of service credentials.
//!
//! Passwords are encrypted at rest, everything else is stored as is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::crypto::Crypto;
use crate::error::Result;

/// Credential as saved on database.
#[derive(Clone, Debug, sqlx::FromRow)]
struct StoredCredential {
    id: i64,
    user_id: i64,
    service: String,
    login: Option<String>,
    password_cipher: String,
    url: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

/// Decrypted view handed to the owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub owner: i64,
    pub service: String,
    pub login: Option<String>,
    pub password: String,
    pub url: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct NewCredential {
    #[validate(length(min = 1, max = 100, message = "Service must be 1 to 100 characters long."))]
    pub service: String,
    #[validate(length(max = 200))]
    pub login: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Password must be 1 to 500 characters long."))]
    pub password: String,
    #[validate(url(message = "URL must be formated."))]
    pub url: Option<String>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// Credential manager.
#[derive(Clone)]
pub struct CredentialService {
    pool: SqlitePool,
    crypto: Arc<Crypto>,
}

impl CredentialService {
    /// Create a new [`CredentialService`].
    pub fn new(pool: SqlitePool, crypto: Arc<Crypto>) -> Self {
        Self { pool, crypto }
    }

    fn decrypt(&self, stored: StoredCredential) -> Result<Credential> {
        Ok(Credential {
            password: self
                .crypto
                .symmetric
                .decrypt_from_hex(&stored.password_cipher)?,
            id: stored.id,
            owner: stored.user_id,
            service: stored.service,
            login: stored.login,
            url: stored.url,
            note: stored.note,
            created_at: stored.created_at,
        })
    }

    /// Store a credential for `owner`.
    pub async fn add(&self, owner: i64, credential: &NewCredential) -> Result<Credential> {
        let cipher = self
            .crypto
            .symmetric
            .encrypt_and_hex(&credential.password)?;

        let stored = sqlx::query_as::<_, StoredCredential>(
            r#"INSERT INTO user_credentials (user_id, service, login, password_cipher, url, note, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING *"#,
        )
        .bind(owner)
        .bind(&credential.service)
        .bind(&credential.login)
        .bind(cipher)
        .bind(&credential.url)
        .bind(&credential.note)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(owner, credential_id = stored.id, "credential stored");

        self.decrypt(stored)
    }

    /// Credentials of `owner`, by service name.
    pub async fn list(&self, owner: i64) -> Result<Vec<Credential>> {
        let stored = sqlx::query_as::<_, StoredCredential>(
            "SELECT * FROM user_credentials WHERE user_id = ? ORDER BY service, id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        stored.into_iter().map(|s| self.decrypt(s)).collect()
    }

    /// Delete one credential of `owner`.
    ///
    /// Someone else's credential reads as missing.
    pub async fn delete(&self, owner: i64, id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM user_credentials WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}
