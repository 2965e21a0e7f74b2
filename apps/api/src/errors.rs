use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::enhance::EnhanceError;
use crate::export::ExportError;
use crate::storage::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Refused mutations are not errors: they are reported in the mutation response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation was refused before any external call because a precondition
    /// (a name, a painted preview) is missing.
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Enhancement error: {0}")]
    Enhancement(#[from] EnhanceError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PreconditionFailed(msg) => (
                StatusCode::PRECONDITION_FAILED,
                "PRECONDITION_FAILED",
                msg.clone(),
            ),
            AppError::Storage(StoreError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Resume {id} not found"),
            ),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Не удалось сохранить или загрузить резюме".to_string(),
                )
            }
            AppError::Enhancement(e) => {
                tracing::error!("Enhancement error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ENHANCEMENT_ERROR",
                    "Не удалось улучшить текст".to_string(),
                )
            }
            AppError::Export(ExportError::Busy) => (
                StatusCode::CONFLICT,
                "IN_PROGRESS",
                ExportError::Busy.user_message().to_string(),
            ),
            AppError::Export(e) if e.is_precondition() => (
                StatusCode::PRECONDITION_FAILED,
                "PRECONDITION_FAILED",
                e.user_message().to_string(),
            ),
            AppError::Export(e) => {
                tracing::error!("Export error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_ERROR",
                    e.user_message().to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
