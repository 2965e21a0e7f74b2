//! Export Pipeline: painted preview surface in, single paginated PDF out.
//!
//! The preview is painted by the client; the server never rasterizes a VisualTree
//! itself. The client uploads the painted surface for a document revision, and export
//! turns that raster into image pages laid out on A4 or Letter.

pub mod file;
pub mod handlers;
pub mod page;
pub mod pdf;
pub mod pipeline;
pub mod raster;

use thiserror::Error;

pub use raster::UploadedSurfaces;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no preview surface has been uploaded for this session")]
    SurfaceNotReady,

    #[error("preview surface is for revision {surface_revision}, document is at {document_revision}")]
    StaleSurface {
        surface_revision: u64,
        document_revision: u64,
    },

    #[error("surface is {pixel_width}x{pixel_height} pixels but declared as {logical_width}x{logical_height}")]
    SurfaceMismatch {
        pixel_width: u32,
        pixel_height: u32,
        logical_width: u32,
        logical_height: u32,
    },

    #[error("supersampled surface would be {pixels} pixels")]
    SurfaceTooLarge { pixels: u64 },

    #[error("an export for this session is already running")]
    Busy,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ExportError {
    /// Refused before any work was done because something the user must provide is missing.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ExportError::SurfaceNotReady
                | ExportError::StaleSurface { .. }
                | ExportError::SurfaceMismatch { .. }
                | ExportError::SurfaceTooLarge { .. }
        )
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::SurfaceNotReady => {
                "Предпросмотр резюме ещё не готов. Откройте предпросмотр и повторите экспорт"
            }
            ExportError::StaleSurface { .. } => {
                "Предпросмотр устарел. Обновите предпросмотр и повторите экспорт"
            }
            ExportError::SurfaceMismatch { .. } => {
                "Размер изображения предпросмотра не совпадает с макетом. Обновите предпросмотр"
            }
            ExportError::SurfaceTooLarge { .. } => "Предпросмотр слишком большой для экспорта",
            ExportError::Busy => "Экспорт уже выполняется",
            ExportError::Image(_) => "Не удалось подготовить изображение резюме",
            ExportError::Pdf(_) | ExportError::Task(_) => "Не удалось создать PDF",
            ExportError::Io(_) => "Не удалось сохранить PDF",
        }
    }
}
