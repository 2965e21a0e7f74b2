//! PDF assembly with lopdf: one JPEG image XObject per page.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::export::page::{PageSize, Placement};
use crate::export::ExportError;

const JPEG_QUALITY: u8 = 92;

/// One page: an encoded JPEG and where it sits on the page.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub jpeg: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub placement: Placement,
}

pub fn encode_jpeg(pixels: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut out), JPEG_QUALITY).encode_image(pixels)?;
    Ok(out)
}

/// Builds the whole document in memory.
pub fn build_pdf(pages: &[PdfPage], page_size: PageSize) -> Result<Vec<u8>, ExportError> {
    let (page_w, page_h) = page_size.dimensions();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(page.pixel_width),
                "Height" => i64::from(page.pixel_height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
                "Filter" => "DCTDecode",
            },
            page.jpeg.clone(),
        );
        let image_id = doc.add_object(image);

        let p = page.placement;
        // PDF origin is bottom-left.
        let pdf_y = page_h - p.y - p.height;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(p.width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(p.height),
                        Object::Real(p.x),
                        Object::Real(pdf_y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_w),
                Object::Real(page_h),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
