//! Debounced, re-entrancy-guarded persistence of a session's document.
//!
//! Every request bumps the session's save generation and schedules a task that waits
//! out the quiet period. Only the task holding the latest generation writes, so a burst
//! of requests collapses into a single storage call. A request that arrives while a
//! write is in flight is dropped.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::editor::session::SessionHandle;
use crate::errors::AppError;
use crate::models::document::encode;
use crate::storage::{DocumentStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveRequest {
    /// Will be written after the quiet period unless superseded.
    Scheduled,
    /// A write for this session is running; the request was dropped.
    AlreadyInFlight,
}

#[derive(Clone)]
pub struct SaveScheduler {
    store: Arc<dyn DocumentStore>,
    quiet_period: Duration,
}

impl SaveScheduler {
    pub fn new(store: Arc<dyn DocumentStore>, quiet_period: Duration) -> Self {
        Self {
            store,
            quiet_period,
        }
    }

    pub async fn request_save(&self, handle: Arc<SessionHandle>) -> Result<SaveRequest, AppError> {
        {
            let session = handle.session.lock().await;
            if session.name.is_empty() {
                return Err(AppError::PreconditionFailed(
                    "Введите название резюме перед сохранением".to_string(),
                ));
            }
        }

        if handle.saving.is_active() {
            debug!("Save for session {} already in flight; dropping request", handle.id);
            return Ok(SaveRequest::AlreadyInFlight);
        }

        let generation = handle.save_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let store = self.store.clone();
        let quiet_period = self.quiet_period;

        tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            if handle.save_generation.load(Ordering::SeqCst) != generation {
                debug!("Save generation {generation} for session {} superseded", handle.id);
                return;
            }
            let Some(_guard) = handle.saving.try_begin() else {
                debug!("Save for session {} already in flight; dropping", handle.id);
                return;
            };

            if let Err(e) = persist(store.as_ref(), &handle).await {
                error!("Saving session {} failed: {e}", handle.id);
                handle
                    .session
                    .lock()
                    .await
                    .mark_save_failed("Не удалось сохранить резюме");
            }
        });

        Ok(SaveRequest::Scheduled)
    }
}

/// Writes the current snapshot. The session lock is released during the storage call so
/// mutations keep flowing; the revision captured here is what gets marked as saved.
async fn persist(store: &dyn DocumentStore, handle: &SessionHandle) -> Result<(), StoreError> {
    let (owner_id, resume_id, name, raw, revision) = {
        let session = handle.session.lock().await;
        (
            session.owner_id.clone(),
            session.resume_id,
            session.name.clone(),
            encode(&session.document),
            session.revision,
        )
    };

    let resume_id = match resume_id {
        Some(id) => {
            store.update_document(id, raw, &name).await?;
            id
        }
        None => store.create_document(&owner_id, raw, &name).await?,
    };

    handle.session.lock().await.mark_saved(resume_id, revision);
    info!("Saved session {} as resume {resume_id} (revision {revision})", handle.id);
    Ok(())
}
