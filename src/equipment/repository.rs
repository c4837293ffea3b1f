//! Handle database requests.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::database::{self, is_transient, is_unique_violation};
use crate::equipment::{
    Equipment, EquipmentFilter, EquipmentHistoryEntry, EquipmentStatus,
    NewEquipment, current_inventory_prefix,
};
use crate::error::{Result, ServerError};
use crate::telemetry;

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: SqlitePool,
}

impl EquipmentRepository {
    /// Create a new [`EquipmentRepository`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert [`Equipment`] as `available`.
    ///
    /// Without an inventory number, the next free one of the category is
    /// allocated.
    pub async fn create(&self, equipment: &NewEquipment) -> Result<Equipment> {
        equipment.validate()?;

        let created = match &equipment.inventory {
            Some(inventory) => sqlx::query_as::<_, Equipment>(
                r#"INSERT INTO equipment (inv_number, model, serial, category, status, created_at)
                    VALUES (?, ?, ?, ?, 'available', ?)
                    RETURNING *"#,
            )
            .bind(inventory.trim())
            .bind(&equipment.model)
            .bind(&equipment.serial)
            .bind(&equipment.category)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| ServerError::constraint(err, "equipment"))?,
            None => self.create_generated(equipment).await?,
        };

        tracing::info!(
            equipment_id = created.id,
            inventory = %created.inventory,
            "equipment created"
        );

        Ok(created)
    }

    async fn create_generated(&self, equipment: &NewEquipment) -> Result<Equipment> {
        let prefix = current_inventory_prefix(&equipment.category);
        let prefix = prefix.as_str();

        let created = database::retry(
            |err| is_unique_violation(err) || is_transient(err),
            move || {
                sqlx::query_as::<_, Equipment>(
                    r#"INSERT INTO equipment (inv_number, model, serial, category, status, created_at)
                        SELECT ?1 || printf('%04d', COALESCE(MAX(CAST(substr(inv_number, ?2) AS INTEGER)), 0) + 1),
                            ?3, ?4, ?5, 'available', ?6
                        FROM equipment
                        WHERE inv_number LIKE ?1 || '%'
                        RETURNING *"#,
                )
                .bind(prefix)
                .bind(prefix.len() as i64 + 1)
                .bind(&equipment.model)
                .bind(&equipment.serial)
                .bind(&equipment.category)
                .bind(Utc::now())
                .fetch_one(&self.pool)
            },
        )
        .await?;

        Ok(created)
    }

    /// Find equipment using its surrogate id.
    pub async fn find(&self, id: i64) -> Result<Option<Equipment>> {
        let equipment = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(equipment)
    }

    /// Find equipment using its inventory number.
    pub async fn find_by_inventory(&self, inventory: &str) -> Result<Option<Equipment>> {
        let equipment = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE inv_number = ?",
        )
        .bind(inventory)
        .fetch_optional(&self.pool)
        .await?;

        Ok(equipment)
    }

    /// List equipment ordered by inventory number.
    pub async fn list(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM equipment WHERE 1 = 1");

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(holder) = filter.holder {
            query
                .push(" AND status = 'assigned' AND user_id = ")
                .push_bind(holder);
        }
        if let Some(workplace) = filter.workplace {
            query.push(" AND workplace_id = ").push_bind(workplace);
        }
        query.push(" ORDER BY inv_number");

        let equipment = query
            .build_query_as::<Equipment>()
            .fetch_all(&self.pool)
            .await?;

        Ok(equipment)
    }

    /// Equipment currently held by `holder`.
    pub async fn by_holder(&self, holder: i64) -> Result<Vec<Equipment>> {
        self.list(&EquipmentFilter {
            status: Some(EquipmentStatus::Assigned),
            holder: Some(holder),
            workplace: None,
        })
        .await
    }

    /// Hand equipment over to `holder`.
    ///
    /// The history row, with the previous holder read by the same
    /// statement, and the holder update commit together.
    pub async fn assign(
        &self,
        id: i64,
        holder: i64,
        actor: i64,
        reason: Option<&str>,
    ) -> Result<Equipment> {
        let assigned = database::retry(is_transient, move || async move {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;

            let recorded = sqlx::query(
                r#"INSERT INTO equipment_history (equipment_id, inv_number, from_user_id, to_user_id, assigned_by, assigned_at, reason)
                    SELECT id, inv_number, user_id, ?, ?, ?, ? FROM equipment WHERE id = ?"#,
            )
            .bind(holder)
            .bind(actor)
            .bind(now)
            .bind(reason)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if recorded == 0 {
                return Ok(None);
            }

            let equipment = sqlx::query_as::<_, Equipment>(
                r#"UPDATE equipment SET status = 'assigned', user_id = ?, assigned_at = ?
                    WHERE id = ?
                    RETURNING *"#,
            )
            .bind(holder)
            .bind(now)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, sqlx::Error>(Some(equipment))
        })
        .await?
        .ok_or(ServerError::NotFound("equipment"))?;

        tracing::info!(
            equipment_id = id,
            inventory = %assigned.inventory,
            holder,
            actor,
            "equipment assigned"
        );
        telemetry::equipment_moved();

        Ok(assigned)
    }

    /// Set or clear the workplace an item is placed at.
    pub async fn place(&self, inventory: &str, workplace: Option<&str>) -> Result<Equipment> {
        let workplace_id = match workplace {
            Some(number) => Some(
                sqlx::query_scalar::<_, i64>("SELECT id FROM workplaces WHERE number = ?")
                    .bind(number)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(ServerError::NotFound("workplace"))?,
            ),
            None => None,
        };

        let equipment = sqlx::query_as::<_, Equipment>(
            "UPDATE equipment SET workplace_id = ? WHERE inv_number = ? RETURNING *",
        )
        .bind(workplace_id)
        .bind(inventory)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServerError::NotFound("equipment"))?;

        tracing::info!(%inventory, ?workplace_id, "equipment placed");

        Ok(equipment)
    }

    /// Hard delete. History rows are kept.
    pub async fn delete(&self, inventory: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM equipment WHERE inv_number = ?")
            .bind(inventory)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            tracing::info!(%inventory, "equipment deleted");
        }

        Ok(deleted > 0)
    }

    /// Reassignments of an item, oldest first.
    pub async fn history(&self, id: i64) -> Result<Vec<EquipmentHistoryEntry>> {
        let entries = sqlx::query_as::<_, EquipmentHistoryEntry>(
            r#"SELECT h.id, h.equipment_id, h.inv_number,
                    h.from_user_id, f.full_name AS from_name,
                    h.to_user_id, t.full_name AS to_name,
                    h.assigned_by, h.assigned_at, h.reason
                FROM equipment_history h
                LEFT JOIN users f ON f.id = h.from_user_id
                LEFT JOIN users t ON t.id = h.to_user_id
                WHERE h.equipment_id = ?
                ORDER BY h.id"#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    fn laptop(inventory: Option<&str>) -> NewEquipment {
        NewEquipment {
            inventory: inventory.map(str::to_owned),
            model: "ThinkPad T14".into(),
            serial: "PF-12345".into(),
            category: "laptop".into(),
        }
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_two_step_history(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);
        let item = repo.create(&laptop(Some("INV-001"))).await.unwrap();
        assert_eq!(item.status, EquipmentStatus::Available);
        assert_eq!(item.holder_id, None);

        repo.assign(item.id, 1001, 2001, None).await.unwrap();
        let item = repo
            .assign(item.id, 1002, 2001, Some("moved to logistics"))
            .await
            .unwrap();
        assert_eq!(item.status, EquipmentStatus::Assigned);
        assert_eq!(item.holder_id, Some(1002));

        let history = repo.history(item.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!((history[0].from_user, history[0].to_user), (None, 1001));
        assert_eq!((history[1].from_user, history[1].to_user), (Some(1001), 1002));
        assert_eq!(history[1].from_name.as_deref(), Some("Ivan Ivanov"));
        assert_eq!(history[1].reason.as_deref(), Some("moved to logistics"));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_concurrent_assign_keeps_chain(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);
        let id = repo.create(&laptop(Some("INV-010"))).await.unwrap().id;

        let tasks: Vec<_> = [1001, 1002, 2001, 2002]
            .into_iter()
            .map(|holder| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.assign(id, holder, 2001, None).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let history = repo.history(id).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].from_user, None);
        assert!(
            history
                .windows(2)
                .all(|w| w[1].from_user == Some(w[0].to_user))
        );

        let item = repo.find(id).await.unwrap().unwrap();
        assert_eq!(item.holder_id, history.last().map(|h| h.to_user));
    }

    #[sqlx::test]
    async fn test_blank_inventory(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);

        assert!(matches!(
            repo.create(&laptop(Some("   "))).await,
            Err(ServerError::Validation(_))
        ));
        assert!(repo.find_by_inventory("").await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn test_duplicate_inventory(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);
        repo.create(&laptop(Some("INV-001"))).await.unwrap();

        assert!(matches!(
            repo.create(&laptop(Some("INV-001"))).await,
            Err(ServerError::Constraint("equipment"))
        ));
    }

    #[sqlx::test]
    async fn test_generated_inventory(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);
        let year = chrono::Local::now().year();

        let first = repo.create(&laptop(None)).await.unwrap();
        let second = repo.create(&laptop(None)).await.unwrap();
        let other = repo
            .create(&NewEquipment {
                category: "projector".into(),
                ..laptop(None)
            })
            .await
            .unwrap();

        assert_eq!(first.inventory, format!("LT-{year}-0001"));
        assert_eq!(second.inventory, format!("LT-{year}-0002"));
        assert_eq!(other.inventory, format!("OT-{year}-0001"));
    }

    #[sqlx::test]
    async fn test_assign_missing(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);

        assert!(matches!(
            repo.assign(42, 1001, 2001, None).await,
            Err(ServerError::NotFound("equipment"))
        ));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_delete_keeps_history(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);
        let item = repo.create(&laptop(Some("INV-002"))).await.unwrap();
        repo.assign(item.id, 1001, 2001, None).await.unwrap();

        assert!(repo.delete("INV-002").await.unwrap());
        assert!(!repo.delete("INV-002").await.unwrap());
        assert!(repo.find(item.id).await.unwrap().is_none());
        assert_eq!(repo.history(item.id).await.unwrap().len(), 1);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_list_filters(pool: SqlitePool) {
        let repo = EquipmentRepository::new(pool);
        let a = repo.create(&laptop(Some("INV-A"))).await.unwrap();
        repo.create(&laptop(Some("INV-B"))).await.unwrap();
        repo.assign(a.id, 1001, 2001, None).await.unwrap();

        let held = repo.by_holder(1001).await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].inventory, "INV-A");

        let available = repo
            .list(&EquipmentFilter {
                status: Some(EquipmentStatus::Available),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].inventory, "INV-B");
    }

    #[sqlx::test]
    async fn test_place(pool: SqlitePool) {
        sqlx::query("INSERT INTO workplaces (number, floor, created_at) VALUES ('401', 4, '2025-01-01T08:00:00+00:00')")
            .execute(&pool)
            .await
            .unwrap();
        let repo = EquipmentRepository::new(pool);
        repo.create(&laptop(Some("INV-003"))).await.unwrap();

        let placed = repo.place("INV-003", Some("401")).await.unwrap();
        assert!(placed.workplace_id.is_some());
        assert!(matches!(
            repo.place("INV-003", Some("999")).await,
            Err(ServerError::NotFound("workplace"))
        ));
        assert!(matches!(
            repo.place("INV-404", None).await,
            Err(ServerError::NotFound("equipment"))
        ));
        assert_eq!(repo.place("INV-003", None).await.unwrap().workplace_id, None);
    }
}
