use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::editor::handlers::find_session;
use crate::errors::AppError;
use crate::models::document::TemplateId;
use crate::render::{render, VisualTree};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// Overrides the document's own template for this preview only.
    pub template: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    /// Revision the tree was rendered from. A painted surface must be uploaded with it.
    pub revision: u64,
    pub tree: VisualTree,
}

/// GET /api/v1/sessions/:id/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, AppError> {
    let handle = find_session(&state, id).await?;
    let session = handle.session.lock().await;
    let template = params
        .template
        .as_deref()
        .map(TemplateId::parse_or_default)
        .unwrap_or(session.document.template_id);

    Ok(Json(PreviewResponse {
        revision: session.revision,
        tree: render(&session.document, template),
    }))
}
