//! Axum route handlers for the Section Registry.

use axum::{extract::Path, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::document::{CustomSection, SectionKind};
use crate::sections::registry::{defaults_for, fields_for, kind_label, FieldSpec};

#[derive(Debug, Serialize)]
pub struct SectionSchemaResponse {
    pub kind: SectionKind,
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
    pub defaults: CustomSection,
}

/// GET /api/v1/sections/:kind/fields
///
/// Returns the editor schema for a custom-section type plus a default instance.
pub async fn handle_section_schema(
    Path(kind): Path<String>,
) -> Result<Json<SectionSchemaResponse>, AppError> {
    let kind = SectionKind::parse(&kind)
        .ok_or_else(|| AppError::NotFound(format!("Unknown section type '{kind}'")))?;

    Ok(Json(SectionSchemaResponse {
        kind,
        label: kind_label(kind),
        fields: fields_for(kind),
        defaults: defaults_for(kind),
    }))
}
