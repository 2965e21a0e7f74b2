use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::editor::handlers::{find_session, MutationResponse};
use crate::editor::mutations::{get_field, refuse, FieldPath, Mutation, Refusal};
use crate::enhance::prompts::{choose_prompt, prompt_for_field};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub prompt: Option<String>,
    pub original_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct EnhanceFieldRequest {
    pub path: FieldPath,
    pub prompt: Option<String>,
}

/// POST /api/enhance
///
/// Passthrough: `{prompt, originalText}` in, `{result}` out.
pub async fn handle_enhance(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<EnhanceResponse>, AppError> {
    let (Some(prompt), Some(original_text)) = (
        req.prompt.filter(|p| !p.is_empty()),
        req.original_text.filter(|t| !t.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Prompt and original text are required".to_string(),
        ));
    };

    let result = state.enhancer.enhance(&prompt, &original_text).await?;
    Ok(Json(EnhanceResponse { result }))
}

/// POST /api/v1/sessions/:id/enhance
///
/// Enhances one field and writes the result back into that same field. The session is
/// not locked during the external call; on failure the document is left as it was.
/// If the field's entry was removed meanwhile, the result is dropped and reported as
/// a refusal.
pub async fn handle_enhance_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<EnhanceFieldRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    if !req.path.is_free_text() {
        return Err(AppError::Validation(format!(
            "'{}' cannot be enhanced",
            req.path.field_name()
        )));
    }

    let handle = find_session(&state, id).await?;

    let (anchor, original) = {
        let session = handle.session.lock().await;
        let not_found = || AppError::NotFound("Field not found".to_string());
        let original = get_field(&session.document, &req.path).ok_or_else(not_found)?;
        let anchor = session.anchor(&req.path).ok_or_else(not_found)?;
        (anchor, original)
    };
    if original.trim().is_empty() {
        return Err(AppError::PreconditionFailed(
            "Заполните поле перед улучшением текста".to_string(),
        ));
    }

    let prompt = choose_prompt(req.prompt.as_deref(), || {
        prompt_for_field(req.path.field_name())
    });
    let improved = state.enhancer.enhance(&prompt, &original).await?;

    let mut session = handle.session.lock().await;
    let outcome = match session.resolve(&anchor) {
        Some(path) => {
            info!("Enhanced field {:?} in session {id}", path);
            session.apply(&Mutation::SetField {
                path,
                value: improved,
            })
        }
        None => refuse(Refusal::FieldRemoved {
            field: req.path.field_name().to_string(),
        }),
    };

    Ok(Json(MutationResponse::new(outcome, &session)))
}
