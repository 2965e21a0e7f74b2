use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::ResumeSummary;

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<OwnerQuery>,
) -> Result<Json<Vec<ResumeSummary>>, AppError> {
    if params.owner_id.trim().is_empty() {
        return Err(AppError::Validation("owner_id must not be empty".to_string()));
    }
    Ok(Json(state.store.list_documents(&params.owner_id).await?))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.store.delete_document(id).await?;
    info!("Deleted resume {id}");
    Ok(StatusCode::NO_CONTENT)
}
