//! Page geometry. All placements use a top-left origin in PDF points; the PDF writer
//! flips them into PDF's bottom-left space.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Width and height in points (1/72 inch).
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Whole surface on one page, scaled down to fit and centered.
    #[default]
    Fit,
    /// Surface scaled to page width and cut into page-height strips.
    Paginate,
}

/// Where an image lands on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// `scale = min(page_w / image_w, page_h / image_h)`, centered on both axes.
pub fn fit_to_page(image_width: u32, image_height: u32, page: PageSize) -> Placement {
    let (page_w, page_h) = page.dimensions();
    let (img_w, img_h) = (image_width.max(1) as f32, image_height.max(1) as f32);
    let scale = (page_w / img_w).min(page_h / img_h);
    let (width, height) = (img_w * scale, img_h * scale);
    Placement {
        scale,
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
        width,
        height,
    }
}

/// A horizontal strip of the raster and where it goes on its own page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlice {
    pub top_px: u32,
    pub height_px: u32,
    pub placement: Placement,
}

/// Width-fit strips, top to bottom. A raster shorter than one page yields one slice.
pub fn paginate(image_width: u32, image_height: u32, page: PageSize) -> Vec<PageSlice> {
    let (page_w, page_h) = page.dimensions();
    let image_width = image_width.max(1);
    let image_height = image_height.max(1);
    let scale = page_w / image_width as f32;
    let strip_px = ((page_h / scale).floor() as u32).max(1);

    let mut slices = Vec::new();
    let mut top = 0;
    while top < image_height {
        let height_px = strip_px.min(image_height - top);
        slices.push(PageSlice {
            top_px: top,
            height_px,
            placement: Placement {
                scale,
                x: 0.0,
                y: 0.0,
                width: page_w,
                height: height_px as f32 * scale,
            },
        });
        top += height_px;
    }
    slices
}
