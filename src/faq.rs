//! FAQ materials and the broadcast list built when one is published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::error::Result;
use crate::user::UserRepository;

/// Material as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Material {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub file_id: Option<String>,
    pub file_type: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewMaterial {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters long."))]
    pub title: String,
    #[validate(length(min = 1, max = 4000, message = "Description must be 1 to 4000 characters long."))]
    pub description: String,
    pub file_id: Option<String>,
    pub file_type: Option<String>,
}

/// A published material and who should receive it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub material: Material,
    /// Point-in-time snapshot of authorized identities.
    pub recipients: Vec<i64>,
}

#[derive(Clone)]
pub struct FaqRepository {
    pool: SqlitePool,
    users: UserRepository,
}

impl FaqRepository {
    /// Create a new [`FaqRepository`].
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Insert a material and snapshot its recipients.
    pub async fn create(&self, author: i64, material: &NewMaterial) -> Result<Broadcast> {
        let material = sqlx::query_as::<_, Material>(
            r#"INSERT INTO faq_materials (title, description, file_id, file_type, created_by, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                RETURNING *"#,
        )
        .bind(&material.title)
        .bind(&material.description)
        .bind(&material.file_id)
        .bind(&material.file_type)
        .bind(author)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let recipients = self.users.all_ids().await?;
        tracing::info!(material_id = material.id, recipients = recipients.len(), "faq material published");

        Ok(Broadcast {
            material,
            recipients,
        })
    }

    /// Materials newest first.
    pub async fn list(&self) -> Result<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(
            "SELECT * FROM faq_materials ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(materials)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Material>> {
        let material = sqlx::query_as::<_, Material>("SELECT * FROM faq_materials WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(material)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM faq_materials WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}
