use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::editor::handlers::find_session;
use crate::errors::AppError;
use crate::export::file::content_disposition;
use crate::export::page::{LayoutMode, PageSize};
use crate::export::pipeline::{export_session, ExportOptions};
use crate::export::raster::UploadedSurface;
use crate::state::AppState;

/// Upper bound for an uploaded preview image.
pub const MAX_SURFACE_BYTES: usize = 20 * 1024 * 1024;
/// Largest accepted logical surface edge, in CSS pixels.
const MAX_SURFACE_EDGE: u32 = 10_000;

#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default)]
    pub layout: LayoutMode,
}

#[derive(Debug, Serialize)]
pub struct SurfaceAccepted {
    pub revision: u64,
    pub stale: bool,
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("Field '{name}' must be a number")))
}

/// PUT /api/v1/sessions/:id/surface
///
/// Multipart fields: `image` (PNG or JPEG), `width`, `height` (logical CSS pixels)
/// and `revision` (document revision the preview was painted from).
pub async fn handle_upload_surface(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SurfaceAccepted>, AppError> {
    let handle = find_session(&state, id).await?;

    let mut encoded: Option<Bytes> = None;
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;
    let mut revision: Option<u64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        debug!("Surface upload field '{name}'");
        match name.as_str() {
            "image" => {
                encoded = Some(field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read image data: {e}"))
                })?);
            }
            "width" | "height" | "revision" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;
                match name.as_str() {
                    "width" => width = Some(parse_number(&name, &text)?),
                    "height" => height = Some(parse_number(&name, &text)?),
                    _ => revision = Some(parse_number(&name, &text)?),
                }
            }
            _ => {}
        }
    }

    let encoded = encoded.ok_or_else(|| AppError::Validation("Missing 'image' field".into()))?;
    let width = width.ok_or_else(|| AppError::Validation("Missing 'width' field".into()))?;
    let height = height.ok_or_else(|| AppError::Validation("Missing 'height' field".into()))?;
    let revision =
        revision.ok_or_else(|| AppError::Validation("Missing 'revision' field".into()))?;

    if width == 0 || height == 0 || width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
        return Err(AppError::Validation(format!(
            "Surface size must be between 1 and {MAX_SURFACE_EDGE} pixels per side"
        )));
    }
    match image::guess_format(&encoded) {
        Ok(image::ImageFormat::Png) | Ok(image::ImageFormat::Jpeg) => {}
        _ => return Err(AppError::Validation("Image must be PNG or JPEG".into())),
    }

    let surface = UploadedSurface {
        encoded,
        logical_width: width,
        logical_height: height,
        revision,
    };
    surface
        .validate(state.config.export_supersample)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let current = handle.session.lock().await.revision;
    state.surfaces.register(id, surface).await;

    Ok(Json(SurfaceAccepted {
        revision,
        stale: revision != current,
    }))
}

/// POST /api/v1/sessions/:id/export
///
/// Responds with the PDF as an attachment named after the résumé.
pub async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ExportRequest>>,
) -> Result<Response, AppError> {
    let handle = find_session(&state, id).await?;
    let request = body.map(|Json(req)| req).unwrap_or_default();

    let pdf = export_session(
        &handle,
        state.surfaces.as_ref(),
        ExportOptions {
            supersample: state.config.export_supersample,
            page_size: request.page_size,
            layout: request.layout,
            export_dir: state.config.export_dir.clone(),
        },
    )
    .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&pdf.file_name)),
        ],
        pdf.bytes,
    )
        .into_response())
}
