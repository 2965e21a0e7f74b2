use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::editor::mutations::{Mutation, Outcome, Refusal};
use crate::editor::save::SaveRequest;
use crate::editor::session::{EditSession, SaveStatus, SessionHandle};
use crate::errors::AppError;
use crate::models::document::{decode, Document, SectionId, SectionKind};
use crate::models::user::UserProfile;
use crate::sections::registry::display_title;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub owner_id: String,
    /// Open a stored résumé. When absent a new one is started.
    pub resume_id: Option<Uuid>,
    /// Required for a new résumé.
    pub name: Option<String>,
    /// Host profile used to prefill a new résumé.
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub resume_id: Option<Uuid>,
    pub name: String,
    pub revision: u64,
    pub dirty: bool,
    pub last_save: SaveStatus,
    /// Custom sections as listed in the editor sidebar.
    pub outline: Vec<SectionOutline>,
    pub document: Document,
}

#[derive(Debug, Serialize)]
pub struct SectionOutline {
    pub id: SectionId,
    pub kind: SectionKind,
    pub title: String,
}

impl SessionView {
    fn of(session: &EditSession) -> Self {
        Self {
            session_id: session.id,
            resume_id: session.resume_id,
            name: session.name.clone(),
            revision: session.revision,
            dirty: session.is_dirty(),
            last_save: session.last_save.clone(),
            outline: session
                .document
                .custom_sections
                .iter()
                .map(|section| SectionOutline {
                    id: section.id(),
                    kind: section.kind(),
                    title: display_title(section),
                })
                .collect(),
            document: session.document.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefusalView {
    #[serde(flatten)]
    pub refusal: Refusal,
    pub tip: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub applied: bool,
    pub revision: u64,
    pub refusal: Option<RefusalView>,
    pub document: Document,
}

impl MutationResponse {
    pub fn new(outcome: Outcome, session: &EditSession) -> Self {
        let refusal = match outcome {
            Outcome::Applied => None,
            Outcome::Refused(refusal) => Some(RefusalView {
                tip: refusal.tip(),
                refusal,
            }),
        };
        Self {
            applied: refusal.is_none(),
            revision: session.revision,
            refusal,
            document: session.document.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub request: SaveRequest,
}

pub(crate) async fn find_session(state: &AppState, id: Uuid) -> Result<Arc<SessionHandle>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
///
/// Opens an editing session over a stored résumé, or over a new prefilled one.
pub async fn handle_open_session(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    if req.owner_id.trim().is_empty() {
        return Err(AppError::Validation("owner_id must not be empty".to_string()));
    }

    let session = match req.resume_id {
        Some(resume_id) => {
            let row = state.store.load_document(resume_id).await?;
            EditSession::opened(&req.owner_id, resume_id, &row.name, decode(&row.data))
        }
        None => {
            let name = req.name.as_deref().map(str::trim).unwrap_or_default();
            if name.is_empty() {
                return Err(AppError::Validation(
                    "Введите название для нового резюме".to_string(),
                ));
            }
            let document = req
                .profile
                .as_ref()
                .map(Document::prefilled)
                .unwrap_or_default();
            EditSession::new(&req.owner_id, name, document)
        }
    };

    let view = SessionView::of(&session);
    state.sessions.insert(session).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let session = handle.session.lock().await;
    Ok(Json(SessionView::of(&session)))
}

/// DELETE /api/v1/sessions/:id
///
/// Discards the session and anything not yet saved.
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .sessions
        .remove(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
    state.surfaces.discard(id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/mutations
///
/// Refusals are reported with status 200 and a tip; the document is unchanged.
pub async fn handle_apply_mutation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mutation): Json<Mutation>,
) -> Result<Json<MutationResponse>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.session.lock().await;
    let outcome = session.apply(&mutation);
    Ok(Json(MutationResponse::new(outcome, &session)))
}

/// PATCH /api/v1/sessions/:id/name
pub async fn handle_rename_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<SessionView>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.session.lock().await;
    session.rename(&req.name);
    Ok(Json(SessionView::of(&session)))
}

/// POST /api/v1/sessions/:id/save
pub async fn handle_save_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SaveResponse>), AppError> {
    let handle = find_session(&state, id).await?;
    let request = state.saver.request_save(handle).await?;
    info!("Save requested for session {id}: {request:?}");
    Ok((StatusCode::ACCEPTED, Json(SaveResponse { request })))
}
