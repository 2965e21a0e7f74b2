//! Storage: the persistence boundary for résumé documents.
//!
//! The editor only ever exchanges raw JSON with the store; `decode`/`encode` sit on
//! the caller's side. `AppState` carries an `Arc<dyn DocumentStore>` so the backend
//! (PostgreSQL or in-memory) is chosen once at startup.

pub mod handlers;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub use crate::models::resume::{ResumeRow, ResumeSummary};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Resume {0} not found")]
    NotFound(Uuid),
}

/// Remote document storage. Implementations carry no retry or caching logic.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The stored row; name and data come from the same read.
    async fn load_document(&self, id: Uuid) -> Result<ResumeRow, StoreError>;

    async fn create_document(
        &self,
        owner_id: &str,
        raw: Value,
        name: &str,
    ) -> Result<Uuid, StoreError>;

    async fn update_document(&self, id: Uuid, raw: Value, name: &str) -> Result<(), StoreError>;

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError>;

    /// Summaries for one owner, newest first.
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<ResumeSummary>, StoreError>;
}
