//! Rasterizer collaborator.
//!
//! `UploadedSurfaces` is the rasterizer used by the service: the editor client paints
//! the preview and uploads the result for a given document revision. Rasterizing decodes
//! that upload, flattens it onto white and brings it up to the supersampled size.

use std::collections::HashMap;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{Rgb, RgbImage, RgbaImage};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::export::ExportError;

/// Minimum supersampling factor applied to the logical surface size.
pub const MIN_SUPERSAMPLE: u32 = 2;
/// Largest supersampled raster, in pixels.
pub const MAX_RASTER_PIXELS: u64 = 64_000_000;
/// Relative difference allowed between the pixel and logical aspect ratios.
const ASPECT_TOLERANCE: f64 = 0.02;

/// Which surface to rasterize: a session's preview at a specific revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub session_id: Uuid,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    pub supersample: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            supersample: MIN_SUPERSAMPLE,
        }
    }
}

/// Opaque RGB raster of a laid-out surface.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub pixels: RgbImage,
    /// Layout size of the surface in CSS pixels, before supersampling.
    pub logical_width: u32,
    pub logical_height: u32,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        handle: SurfaceHandle,
        options: RasterOptions,
    ) -> Result<RasterImage, ExportError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Client-uploaded surfaces
// ────────────────────────────────────────────────────────────────────────────

/// An encoded PNG or JPEG of the painted preview.
#[derive(Debug, Clone)]
pub struct UploadedSurface {
    pub encoded: Bytes,
    pub logical_width: u32,
    pub logical_height: u32,
    /// Document revision the preview was painted from.
    pub revision: u64,
}

impl UploadedSurface {
    /// Checks the encoded image against the declared logical size.
    ///
    /// The pixel aspect ratio must match the logical one, and the raster supersampled
    /// by `supersample` must stay within `MAX_RASTER_PIXELS`. Only the image header is read.
    pub fn validate(&self, supersample: u32) -> Result<(), ExportError> {
        let (pixel_width, pixel_height) = image::ImageReader::new(Cursor::new(&self.encoded[..]))
            .with_guessed_format()?
            .into_dimensions()?;
        check_dimensions(
            (pixel_width, pixel_height),
            (self.logical_width, self.logical_height),
            supersample,
        )
    }
}

fn check_dimensions(
    (pixel_width, pixel_height): (u32, u32),
    (logical_width, logical_height): (u32, u32),
    supersample: u32,
) -> Result<(), ExportError> {
    let mismatch = || ExportError::SurfaceMismatch {
        pixel_width,
        pixel_height,
        logical_width,
        logical_height,
    };
    if pixel_width == 0 || pixel_height == 0 || logical_width == 0 || logical_height == 0 {
        return Err(mismatch());
    }

    let expected_height =
        f64::from(pixel_width) * f64::from(logical_height) / f64::from(logical_width);
    let allowed = (expected_height * ASPECT_TOLERANCE).max(1.0);
    if (f64::from(pixel_height) - expected_height).abs() > allowed {
        return Err(mismatch());
    }

    let factor = u64::from(supersample.max(MIN_SUPERSAMPLE));
    let target = (u64::from(logical_width) * factor) * (u64::from(logical_height) * factor);
    let pixels = u64::from(pixel_width) * u64::from(pixel_height);
    if target.max(pixels) > MAX_RASTER_PIXELS {
        return Err(ExportError::SurfaceTooLarge {
            pixels: target.max(pixels),
        });
    }
    Ok(())
}

/// Latest uploaded surface per session.
#[derive(Default)]
pub struct UploadedSurfaces {
    surfaces: RwLock<HashMap<Uuid, UploadedSurface>>,
}

impl UploadedSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any earlier surface for the session.
    pub async fn register(&self, session_id: Uuid, surface: UploadedSurface) {
        info!(
            "Registered {}x{} preview surface for session {session_id} at revision {}",
            surface.logical_width, surface.logical_height, surface.revision
        );
        self.surfaces.write().await.insert(session_id, surface);
    }

    pub async fn discard(&self, session_id: Uuid) {
        self.surfaces.write().await.remove(&session_id);
    }
}

#[async_trait]
impl Rasterizer for UploadedSurfaces {
    async fn rasterize(
        &self,
        handle: SurfaceHandle,
        options: RasterOptions,
    ) -> Result<RasterImage, ExportError> {
        let surface = self
            .surfaces
            .read()
            .await
            .get(&handle.session_id)
            .cloned()
            .ok_or(ExportError::SurfaceNotReady)?;

        if surface.revision != handle.revision {
            return Err(ExportError::StaleSurface {
                surface_revision: surface.revision,
                document_revision: handle.revision,
            });
        }

        // Decoding and resampling are CPU-bound and must run inside spawn_blocking.
        tokio::task::spawn_blocking(move || decode_surface(&surface, options)).await?
    }
}

fn decode_surface(
    surface: &UploadedSurface,
    options: RasterOptions,
) -> Result<RasterImage, ExportError> {
    surface.validate(options.supersample)?;
    let decoded = image::load_from_memory(&surface.encoded)?;
    let flattened = flatten_on_white(&decoded.to_rgba8());
    let factor = options.supersample.max(MIN_SUPERSAMPLE);
    let pixels = supersample(
        flattened,
        surface.logical_width * factor,
        surface.logical_height * factor,
    );

    debug!(
        "Rasterized surface to {}x{} (logical {}x{}, factor {factor})",
        pixels.width(),
        pixels.height(),
        surface.logical_width,
        surface.logical_height
    );

    Ok(RasterImage {
        pixels,
        logical_width: surface.logical_width,
        logical_height: surface.logical_height,
    })
}

/// Composites an RGBA image over an opaque white page.
pub fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let over = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([over(r), over(g), over(b)])
    })
}

/// Upscales to the target size. Rasters already at least that wide are kept.
fn supersample(pixels: RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    if pixels.width() == 0 || pixels.width() >= target_width {
        return pixels;
    }
    image::imageops::resize(&pixels, target_width, target_height, FilterType::Lanczos3)
}
