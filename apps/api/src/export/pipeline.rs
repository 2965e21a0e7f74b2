use std::path::PathBuf;

use image::GenericImageView;
use tracing::info;

use crate::editor::session::SessionHandle;
use crate::export::file::{export_file_name, persist_atomically};
use crate::export::page::{fit_to_page, paginate, LayoutMode, PageSize};
use crate::export::pdf::{build_pdf, encode_jpeg, PdfPage};
use crate::export::raster::{RasterImage, RasterOptions, Rasterizer, SurfaceHandle};
use crate::export::ExportError;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub supersample: u32,
    pub page_size: PageSize,
    pub layout: LayoutMode,
    /// When set, the PDF is also written here under its export file name.
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ExportedPdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
    pub saved_to: Option<PathBuf>,
}

/// Rasterizes the session's current preview and assembles the PDF.
///
/// Only one export per session runs at a time; a concurrent request gets `Busy`.
pub async fn export_session(
    handle: &SessionHandle,
    rasterizer: &dyn Rasterizer,
    options: ExportOptions,
) -> Result<ExportedPdf, ExportError> {
    let Some(_guard) = handle.exporting.try_begin() else {
        return Err(ExportError::Busy);
    };

    let (revision, file_name) = {
        let session = handle.session.lock().await;
        (
            session.revision,
            export_file_name(&session.name, &session.document.identity),
        )
    };

    let raster = rasterizer
        .rasterize(
            SurfaceHandle {
                session_id: handle.id,
                revision,
            },
            RasterOptions {
                supersample: options.supersample,
            },
        )
        .await?;

    let page_size = options.page_size;
    let layout = options.layout;
    let (bytes, pages) =
        tokio::task::spawn_blocking(move || assemble(&raster, page_size, layout)).await??;

    let saved_to = match options.export_dir {
        Some(dir) => {
            let name = file_name.clone();
            let data = bytes.clone();
            Some(tokio::task::spawn_blocking(move || persist_atomically(&dir, &name, &data)).await??)
        }
        None => None,
    };

    info!(
        "Exported session {} revision {revision} as '{file_name}' ({pages} page(s), {} bytes)",
        handle.id,
        bytes.len()
    );

    Ok(ExportedPdf {
        file_name,
        bytes,
        pages,
        saved_to,
    })
}

/// Lays the raster out on pages and writes the PDF. CPU-bound.
fn assemble(
    raster: &RasterImage,
    page_size: PageSize,
    layout: LayoutMode,
) -> Result<(Vec<u8>, usize), ExportError> {
    let (width, height) = (raster.width(), raster.height());

    let pages = match layout {
        LayoutMode::Fit => vec![PdfPage {
            jpeg: encode_jpeg(&raster.pixels)?,
            pixel_width: width,
            pixel_height: height,
            placement: fit_to_page(width, height, page_size),
        }],
        LayoutMode::Paginate => paginate(width, height, page_size)
            .into_iter()
            .map(|slice| {
                let strip = raster
                    .pixels
                    .view(0, slice.top_px, width, slice.height_px)
                    .to_image();
                Ok(PdfPage {
                    jpeg: encode_jpeg(&strip)?,
                    pixel_width: width,
                    pixel_height: slice.height_px,
                    placement: slice.placement,
                })
            })
            .collect::<Result<Vec<_>, ExportError>>()?,
    };

    let count = pages.len();
    Ok((build_pdf(&pages, page_size)?, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use bytes::Bytes;
    use image::{ImageFormat, Rgba, RgbaImage};

    use crate::editor::mutations::{FieldPath, Mutation};
    use crate::editor::session::EditSession;
    use crate::export::raster::{UploadedSurface, UploadedSurfaces};
    use crate::models::document::Document;

    fn options(layout: LayoutMode, export_dir: Option<PathBuf>) -> ExportOptions {
        ExportOptions {
            supersample: 2,
            page_size: PageSize::A4,
            layout,
            export_dir,
        }
    }

    fn surface(width: u32, height: u32, revision: u64) -> UploadedSurface {
        let img = RgbaImage::from_pixel(width, height, Rgba([30, 60, 90, 255]));
        let mut encoded = Vec::new();
        img.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .unwrap();
        UploadedSurface {
            encoded: Bytes::from(encoded),
            logical_width: width,
            logical_height: height,
            revision,
        }
    }

    fn session(name: &str) -> Arc<SessionHandle> {
        Arc::new(SessionHandle::new(EditSession::new("vk1", name, Document::default())))
    }

    #[tokio::test]
    async fn test_export_without_surface_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let handle = session("CV");
        let surfaces = UploadedSurfaces::new();
        let err = export_session(
            &handle,
            &surfaces,
            options(LayoutMode::Fit, Some(dir.path().to_path_buf())),
        )
        .await
        .unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(!handle.exporting.is_active());
    }

    #[tokio::test]
    async fn test_export_single_page_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let handle = session("Main CV");
        let surfaces = UploadedSurfaces::new();
        surfaces.register(handle.id, surface(100, 140, 0)).await;

        let pdf = export_session(
            &handle,
            &surfaces,
            options(LayoutMode::Fit, Some(dir.path().to_path_buf())),
        )
        .await
        .unwrap();

        assert_eq!(pdf.file_name, "Main CV.pdf");
        assert_eq!(pdf.pages, 1);
        let saved = pdf.saved_to.unwrap();
        assert_eq!(saved, dir.path().join("Main CV.pdf"));
        assert_eq!(std::fs::read(saved).unwrap(), pdf.bytes);
        assert_eq!(lopdf::Document::load_mem(&pdf.bytes).unwrap().get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_export_after_edit_needs_fresh_surface() {
        let handle = session("CV");
        let surfaces = UploadedSurfaces::new();
        surfaces.register(handle.id, surface(10, 10, 0)).await;
        handle.session.lock().await.apply(&Mutation::SetField {
            path: FieldPath::top("email"),
            value: "a@b.c".to_string(),
        });

        let err = export_session(&handle, &surfaces, options(LayoutMode::Fit, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::StaleSurface { .. }));

        surfaces.register(handle.id, surface(10, 10, 1)).await;
        assert!(export_session(&handle, &surfaces, options(LayoutMode::Fit, None))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_paginate_tall_surface() {
        let handle = session("Long");
        let surfaces = UploadedSurfaces::new();
        // 300x1000 logical, 600x2000 raster: each A4 strip holds 849 px.
        surfaces.register(handle.id, surface(300, 1000, 0)).await;

        let pdf = export_session(&handle, &surfaces, options(LayoutMode::Paginate, None))
            .await
            .unwrap();
        assert_eq!(pdf.pages, 3);
        assert_eq!(lopdf::Document::load_mem(&pdf.bytes).unwrap().get_pages().len(), 3);
        assert!(pdf.saved_to.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_export_is_busy() {
        let handle = session("CV");
        let surfaces = UploadedSurfaces::new();
        surfaces.register(handle.id, surface(10, 10, 0)).await;

        let _guard = handle.exporting.try_begin();
        let err = export_session(&handle, &surfaces, options(LayoutMode::Fit, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Busy));
    }

    #[tokio::test]
    async fn test_generic_file_name_without_identity() {
        let handle = session("");
        let surfaces = UploadedSurfaces::new();
        surfaces.register(handle.id, surface(10, 10, 0)).await;
        let pdf = export_session(&handle, &surfaces, options(LayoutMode::Fit, None))
            .await
            .unwrap();
        assert_eq!(pdf.file_name, "resume.pdf");
    }
}
