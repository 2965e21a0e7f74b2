//! Editing sessions.
//!
//! A session owns exactly one `Document` for its lifetime. Mutations run to completion
//! under the session mutex, one at a time. Save and export are the only suspending
//! operations; each has an `InFlight` flag so a second request while one is running is
//! dropped rather than queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::editor::mutations::{self, FieldPath, ListName, Mutation, Outcome};
use crate::models::document::{Document, SectionId};

// ────────────────────────────────────────────────────────────────────────────
// Session state
// ────────────────────────────────────────────────────────────────────────────

/// Result of the most recent persistence attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveStatus {
    Never,
    Saved { at: DateTime<Utc>, revision: u64 },
    Failed { message: String },
}

#[derive(Debug)]
pub struct EditSession {
    pub id: Uuid,
    pub owner_id: String,
    /// Storage id, `None` until the first successful save of a new résumé.
    pub resume_id: Option<Uuid>,
    /// Declared résumé name; also the export file name.
    pub name: String,
    pub document: Document,
    /// Incremented on every applied mutation.
    pub revision: u64,
    pub saved_revision: Option<u64>,
    pub last_save: SaveStatus,
    /// Bumped whenever an entry of that list is removed and later indices shift.
    education_shape: u64,
    experience_shape: u64,
}

/// A field address that stays valid while the session keeps changing.
///
/// Custom sections are followed by id, so reordering does not redirect a write.
/// Education and experience entries are positional; they resolve only while no entry
/// of that list has been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAnchor {
    Top(String),
    Section {
        id: SectionId,
        field: String,
    },
    Entry {
        list: ListName,
        index: usize,
        field: String,
        shape: u64,
    },
}

impl EditSession {
    /// A session for a résumé that has never been stored.
    pub fn new(owner_id: &str, name: &str, document: Document) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            resume_id: None,
            name: name.trim().to_string(),
            document,
            revision: 0,
            saved_revision: None,
            last_save: SaveStatus::Never,
            education_shape: 0,
            experience_shape: 0,
        }
    }

    /// A session over a résumé loaded from storage.
    pub fn opened(owner_id: &str, resume_id: Uuid, name: &str, document: Document) -> Self {
        Self {
            resume_id: Some(resume_id),
            saved_revision: Some(0),
            ..Self::new(owner_id, name, document)
        }
    }

    pub fn apply(&mut self, mutation: &Mutation) -> Outcome {
        let outcome = mutations::apply(&mut self.document, mutation);
        if outcome.is_applied() {
            match mutation {
                Mutation::RemoveListItem {
                    list: ListName::Education,
                    ..
                } => self.education_shape += 1,
                Mutation::RemoveListItem {
                    list: ListName::Experience,
                    ..
                } => self.experience_shape += 1,
                _ => {}
            }
            self.revision += 1;
            debug!("Session {} now at revision {}", self.id, self.revision);
        }
        outcome
    }

    fn shape(&self, list: ListName) -> u64 {
        match list {
            ListName::Education => self.education_shape,
            ListName::Experience => self.experience_shape,
            ListName::CustomSections => 0,
        }
    }

    /// Pins `path` to what it addresses now. `None` if the custom section does not exist.
    pub fn anchor(&self, path: &FieldPath) -> Option<FieldAnchor> {
        match path {
            FieldPath::Top(field) => Some(FieldAnchor::Top(field.clone())),
            FieldPath::Entry {
                list: ListName::CustomSections,
                index,
                field,
            } => self
                .document
                .custom_sections
                .get(*index)
                .map(|section| FieldAnchor::Section {
                    id: section.id(),
                    field: field.clone(),
                }),
            FieldPath::Entry { list, index, field } => Some(FieldAnchor::Entry {
                list: *list,
                index: *index,
                field: field.clone(),
                shape: self.shape(*list),
            }),
        }
    }

    /// Current path of an anchored field, or `None` once its entry is gone.
    pub fn resolve(&self, anchor: &FieldAnchor) -> Option<FieldPath> {
        match anchor {
            FieldAnchor::Top(field) => Some(FieldPath::Top(field.clone())),
            FieldAnchor::Section { id, field } => self
                .document
                .custom_sections
                .iter()
                .position(|section| section.id() == *id)
                .map(|index| FieldPath::entry(ListName::CustomSections, index, field)),
            FieldAnchor::Entry {
                list,
                index,
                field,
                shape,
            } => (self.shape(*list) == *shape).then(|| FieldPath::entry(*list, *index, field)),
        }
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.trim().to_string();
        // The name is persisted alongside the document.
        self.revision += 1;
    }

    /// True when the in-memory document differs from what was last persisted.
    pub fn is_dirty(&self) -> bool {
        self.saved_revision != Some(self.revision)
    }

    pub fn mark_saved(&mut self, resume_id: Uuid, revision: u64) {
        self.resume_id = Some(resume_id);
        self.saved_revision = Some(revision);
        self.last_save = SaveStatus::Saved {
            at: Utc::now(),
            revision,
        };
    }

    pub fn mark_save_failed(&mut self, message: &str) {
        self.last_save = SaveStatus::Failed {
            message: message.to_string(),
        };
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Re-entrancy guard
// ────────────────────────────────────────────────────────────────────────────

/// Marks a suspending operation as running. At most one guard exists at a time.
#[derive(Debug, Default)]
pub struct InFlight(AtomicBool);

impl InFlight {
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.0))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the flag on drop, including when the operation fails.
#[derive(Debug)]
pub struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

pub struct SessionHandle {
    pub id: Uuid,
    pub session: Mutex<EditSession>,
    pub saving: InFlight,
    pub exporting: InFlight,
    /// Bumped by every save request; a debounced save only runs if it is still the latest.
    pub save_generation: AtomicU64,
}

impl SessionHandle {
    pub fn new(session: EditSession) -> Self {
        Self {
            id: session.id,
            session: Mutex::new(session),
            saving: InFlight::default(),
            exporting: InFlight::default(),
            save_generation: AtomicU64::new(0),
        }
    }

    /// A mutation, save or export is running against this session.
    fn is_busy(&self) -> bool {
        self.saving.is_active() || self.exporting.is_active() || self.session.try_lock().is_err()
    }
}

struct RegistryEntry {
    handle: Arc<SessionHandle>,
    last_touched: Instant,
}

/// All live editing sessions, keyed by session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, RegistryEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: EditSession) -> Arc<SessionHandle> {
        let handle = Arc::new(SessionHandle::new(session));
        self.sessions.write().await.insert(
            handle.id,
            RegistryEntry {
                handle: handle.clone(),
                last_touched: Instant::now(),
            },
        );
        info!("Opened editing session {}", handle.id);
        handle
    }

    /// Looks a session up and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_touched = Instant::now();
        Some(entry.handle.clone())
    }

    /// Drops the session; unsaved edits are discarded.
    pub async fn remove(&self, id: Uuid) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.write().await.remove(&id);
        if removed.is_some() {
            info!("Closed editing session {id}");
        }
        removed.map(|entry| entry.handle)
    }

    /// Drops sessions untouched for at least `idle`, skipping any with work in progress.
    /// Returns the ids that were removed.
    pub async fn cleanup_idle(&self, idle: Duration) -> Vec<Uuid> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, entry)| {
                now.duration_since(entry.last_touched) >= idle && !entry.handle.is_busy()
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(entry) = sessions.remove(id) {
                let dirty = entry
                    .handle
                    .session
                    .try_lock()
                    .map(|session| session.is_dirty())
                    .unwrap_or(false);
                if dirty {
                    warn!("Expired idle session {id} with unsaved edits");
                }
            }
        }
        if !expired.is_empty() {
            info!("Expired {} idle editing sessions", expired.len());
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
