//! In-process document store. Used when no `DATABASE_URL` is configured, and by tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::resume::{ResumeRow, ResumeSummary};
use crate::storage::{DocumentStore, StoreError};

#[derive(Default)]
pub struct MemoryDocumentStore {
    rows: RwLock<HashMap<Uuid, ResumeRow>>,
    writes: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of create/update calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load_document(&self, id: Uuid) -> Result<ResumeRow, StoreError> {
        self.rows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn create_document(
        &self,
        owner_id: &str,
        raw: Value,
        name: &str,
    ) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.rows.write().await.insert(
            id,
            ResumeRow {
                id,
                user_id: owner_id.to_string(),
                name: name.to_string(),
                data: raw,
                created_at: now,
                updated_at: now,
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn update_document(&self, id: Uuid, raw: Value, name: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        row.data = raw;
        row.name = name.to_string();
        row.updated_at = Utc::now();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<ResumeSummary>, StoreError> {
        let rows = self.rows.read().await;
        let mut owned: Vec<&ResumeRow> = rows.values().filter(|r| r.user_id == owner_id).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .map(|r| ResumeSummary {
                id: r.id,
                name: r.name.clone(),
                updated_at: r.updated_at,
            })
            .collect())
    }
}
