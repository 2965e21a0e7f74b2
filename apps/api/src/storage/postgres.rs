use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::resume::{ResumeRow, ResumeSummary};
use crate::storage::{DocumentStore, StoreError};

/// `resumes` table backed by PostgreSQL.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and brings the `resumes` schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("PostgreSQL document store ready");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn load_document(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn create_document(
        &self,
        owner_id: &str,
        raw: Value,
        name: &str,
    ) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO resumes (id, user_id, name, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .bind(raw)
        .execute(&self.pool)
        .await?;

        debug!("Inserted resume {id} for owner {owner_id}");
        Ok(id)
    }

    async fn update_document(&self, id: Uuid, raw: Value, name: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE resumes SET data = $1, name = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(raw)
        .bind(name)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<ResumeSummary>, StoreError> {
        Ok(sqlx::query_as::<_, ResumeSummary>(
            "SELECT id, name, updated_at FROM resumes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
