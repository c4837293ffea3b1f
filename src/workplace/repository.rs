//! Handle database requests.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::config::SeedWorkplace;
use crate::equipment::Equipment;
use crate::error::{Result, ServerError};
use crate::workplace::{NewWorkplace, Workplace, default_seed};

#[derive(Clone)]
pub struct WorkplaceRepository {
    pool: SqlitePool,
    seed: Arc<Vec<NewWorkplace>>,
}

impl WorkplaceRepository {
    /// Create a new [`WorkplaceRepository`] seeding the built-in floors.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            seed: Arc::new(default_seed()),
        }
    }

    /// Replace the built-in seed with configured workplaces.
    pub fn with_seed(mut self, seed: Option<Vec<SeedWorkplace>>) -> Self {
        if let Some(seed) = seed {
            self.seed = Arc::new(seed.into_iter().map(NewWorkplace::from).collect());
        }
        self
    }

    /// Insert seed workplaces that are not there yet.
    ///
    /// Returns how many rows were added.
    pub async fn seed(&self) -> Result<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for workplace in self.seed.iter() {
            inserted += sqlx::query(
                r#"INSERT INTO workplaces (number, department, location, floor, primary_pc, peripherals, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT (number) DO NOTHING"#,
            )
            .bind(&workplace.number)
            .bind(&workplace.department)
            .bind(&workplace.location)
            .bind(workplace.floor)
            .bind(&workplace.primary_pc)
            .bind(&workplace.peripherals)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        if inserted > 0 {
            tracing::info!(inserted, "workplaces seeded");
        }

        Ok(inserted)
    }

    /// Seed only when the directory holds nothing.
    pub async fn seed_if_empty(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workplaces")
            .fetch_one(&self.pool)
            .await?;

        if count == 0 { self.seed().await } else { Ok(0) }
    }

    /// Find a workplace using its number.
    pub async fn find_by_number(&self, number: &str) -> Result<Option<Workplace>> {
        let workplace = sqlx::query_as::<_, Workplace>(
            "SELECT * FROM workplaces WHERE number = ?",
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(workplace)
    }

    /// Every workplace ordered by floor then number.
    pub async fn list(&self) -> Result<Vec<Workplace>> {
        let workplaces = sqlx::query_as::<_, Workplace>(
            "SELECT * FROM workplaces ORDER BY floor, number",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(workplaces)
    }

    /// Workplaces of a floor.
    ///
    /// An empty answer seeds the directory once and asks again.
    pub async fn by_floor(&self, floor: i64) -> Result<Vec<Workplace>> {
        let workplaces = self.fetch_floor(floor).await?;
        if !workplaces.is_empty() {
            return Ok(workplaces);
        }

        if self.seed().await? == 0 {
            return Ok(workplaces);
        }

        tracing::debug!(floor, "floor was empty, retrying after seed");
        self.fetch_floor(floor).await
    }

    async fn fetch_floor(&self, floor: i64) -> Result<Vec<Workplace>> {
        let workplaces = sqlx::query_as::<_, Workplace>(
            "SELECT * FROM workplaces WHERE floor = ? ORDER BY number",
        )
        .bind(floor)
        .fetch_all(&self.pool)
        .await?;

        Ok(workplaces)
    }

    /// Distinct known floors, lowest first.
    pub async fn floors(&self) -> Result<Vec<i64>> {
        let floors = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT floor FROM workplaces WHERE floor IS NOT NULL ORDER BY floor",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(floors)
    }

    /// Insert a [`Workplace`].
    pub async fn create(&self, workplace: &NewWorkplace) -> Result<Workplace> {
        let created = sqlx::query_as::<_, Workplace>(
            r#"INSERT INTO workplaces (number, department, location, floor, primary_pc, peripherals, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING *"#,
        )
        .bind(workplace.number.trim())
        .bind(&workplace.department)
        .bind(&workplace.location)
        .bind(workplace.floor)
        .bind(&workplace.primary_pc)
        .bind(&workplace.peripherals)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| ServerError::constraint(err, "workplace"))?;

        tracing::info!(workplace_id = created.id, number = %created.number, "workplace created");

        Ok(created)
    }

    /// Hard delete. Equipment placed there keeps a dangling reference.
    pub async fn delete(&self, number: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM workplaces WHERE number = ?")
            .bind(number)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            tracing::info!(%number, "workplace deleted");
        }

        Ok(deleted > 0)
    }

    /// Equipment placed at a workplace.
    ///
    /// Returns `None` when the workplace does not exist.
    pub async fn equipment(&self, number: &str) -> Result<Option<Vec<Equipment>>> {
        let Some(workplace) = self.find_by_number(number).await? else {
            return Ok(None);
        };

        let equipment = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE workplace_id = ? ORDER BY inv_number",
        )
        .bind(workplace.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(equipment))
    }
}
