//! Handle database requests.

use sqlx::SqlitePool;

use crate::database::{self, is_transient};
use crate::error::{Result, ServerError};
use crate::rating::{AdminInfo, RatingRecord, check_rating};

#[derive(Clone)]
pub struct RatingRepository {
    pool: SqlitePool,
}

impl RatingRepository {
    /// Create a new [`RatingRepository`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Make `id` an administrator with a rating record.
    ///
    /// Registering twice refreshes the name but keeps accumulated ratings.
    pub async fn register(&self, id: i64, full_name: &str, position: &str) -> Result<AdminInfo> {
        let mut tx = self.pool.begin().await?;

        let promoted = sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if promoted == 0 {
            return Err(ServerError::NotFound("user"));
        }

        let record = sqlx::query_as::<_, RatingRecord>(
            r#"INSERT INTO admin_ratings (user_id, full_name, position, total_rating, rating_count)
                VALUES (?, ?, ?, 0, 0)
                ON CONFLICT (user_id) DO UPDATE SET
                    full_name = excluded.full_name,
                    position = excluded.position
                RETURNING *"#,
        )
        .bind(id)
        .bind(full_name)
        .bind(position)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(admin_id = id, "administrator registered");

        Ok(record.into())
    }

    /// Add one rating to an administrator.
    ///
    /// The increment is a single statement, concurrent calls never lose an
    /// update.
    pub async fn record(&self, id: i64, rating: i64) -> Result<AdminInfo> {
        check_rating(rating)?;

        let record = database::retry(is_transient, move || {
            sqlx::query_as::<_, RatingRecord>(
                r#"UPDATE admin_ratings
                    SET total_rating = total_rating + ?, rating_count = rating_count + 1
                    WHERE user_id = ?
                    RETURNING *"#,
            )
            .bind(rating)
            .bind(id)
            .fetch_optional(&self.pool)
        })
        .await?;

        let Some(record) = record else {
            tracing::warn!(admin_id = id, rating, "rating for an unregistered administrator");
            return Err(ServerError::NotFound("administrator"));
        };

        tracing::info!(admin_id = id, rating, count = record.rating_count, "rating recorded");

        Ok(record.into())
    }

    /// Name and average of an administrator.
    pub async fn info(&self, id: i64) -> Result<Option<AdminInfo>> {
        let record = sqlx::query_as::<_, RatingRecord>(
            "SELECT * FROM admin_ratings WHERE user_id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(AdminInfo::from))
    }

    /// Every registered administrator.
    pub async fn list(&self) -> Result<Vec<AdminInfo>> {
        let records = sqlx::query_as::<_, RatingRecord>(
            "SELECT * FROM admin_ratings ORDER BY full_name, user_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(AdminInfo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_concurrent_records(pool: SqlitePool) {
        let repo = RatingRepository::new(pool);
        let ratings = [5, 4, 3, 5, 1, 2, 4, 5, 3, 4];

        let tasks: Vec<_> = ratings
            .iter()
            .map(|rating| {
                let repo = repo.clone();
                let rating = *rating;
                tokio::spawn(async move { repo.record(2001, rating).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let total: i64 = ratings.iter().sum();
        let record: RatingRecord =
            sqlx::query_as("SELECT * FROM admin_ratings WHERE user_id = 2001")
                .fetch_one(&repo.pool)
                .await
                .unwrap();
        assert_eq!(record.rating_count, ratings.len() as i64);
        assert_eq!(record.total_rating, total);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_register_keeps_totals(pool: SqlitePool) {
        let repo = RatingRepository::new(pool);

        let info = repo.register(2002, "Olga Smirnova", "Lead").await.unwrap();
        assert_eq!(info.average, 4.5);
        assert_eq!(info.ratings, 2);
        assert_eq!(info.position, "Lead");
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_register_promotes(pool: SqlitePool) {
        let repo = RatingRepository::new(pool.clone());

        let info = repo.register(1001, "Ivan Ivanov", "Support").await.unwrap();
        assert_eq!(info.average, 0.0);

        let role: String = sqlx::query_scalar("SELECT role FROM users WHERE id = 1001")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(role, "admin");

        assert!(matches!(
            repo.register(9999, "Nobody", "").await,
            Err(ServerError::NotFound("user"))
        ));
        assert!(repo.info(9999).await.unwrap().is_none());
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_record_rejections(pool: SqlitePool) {
        let repo = RatingRepository::new(pool);

        assert!(matches!(
            repo.record(1001, 4).await,
            Err(ServerError::NotFound("administrator"))
        ));
        assert!(matches!(
            repo.record(2001, 6).await,
            Err(ServerError::Validation(_))
        ));

        let info = repo.record(2002, 5).await.unwrap();
        assert_eq!(info.ratings, 3);
        assert_eq!(info.average, 4.67);
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }
}
