//! Handle database requests.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{Result, ServerError};
use crate::user::{Profile, Role, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh an authorized [`User`].
    ///
    /// A known identity gets its profile replaced but keeps its role; only
    /// [`UserRepository::set_role`] changes roles.
    pub async fn upsert(&self, id: i64, profile: &Profile) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, login, full_name, department, position, role, email, created_at)
                VALUES (?, ?, ?, ?, ?, 'user', ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    login = excluded.login,
                    full_name = excluded.full_name,
                    department = excluded.department,
                    position = excluded.position,
                    email = excluded.email
                RETURNING *"#,
        )
        .bind(id)
        .bind(profile.login.trim())
        .bind(&profile.full_name)
        .bind(&profile.department)
        .bind(&profile.position)
        .bind(&profile.email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| ServerError::constraint(err, "login"))?;

        tracing::info!(user_id = id, role = %user.role, "user authorized");

        Ok(user)
    }

    /// Explicitly change the role of an identity.
    pub async fn set_role(&self, id: i64, role: Role) -> Result<()> {
        let updated = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(ServerError::NotFound("user"));
        }

        tracing::info!(user_id = id, %role, "role changed");

        Ok(())
    }

    /// Find a user using its identity.
    pub async fn find(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Role of an identity, `None` if it is not authorized.
    pub async fn role(&self, id: i64) -> Result<Option<Role>> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }

    /// Hard delete the authorization row.
    ///
    /// Tickets and equipment keep referencing the identity.
    pub async fn remove(&self, id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            tracing::info!(user_id = id, "user removed");
        }

        Ok(deleted > 0)
    }

    /// Identities to notify about new tickets.
    pub async fn admin_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM users WHERE role = 'admin' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Snapshot of every authorized identity, for broadcasts.
    pub async fn all_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}
