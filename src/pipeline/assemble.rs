//! Final document assembly: one page per normalized image.
//!
//! Runs on the orchestrating side, not in the worker — the worker's job
//! ends at normalized JPEG + layout, and building the document in one place
//! keeps the object numbering and page tree trivially consistent.
//!
//! Every image arrives as JPEG, so each page embeds its bytes verbatim as a
//! DCTDecode image XObject; no pixel data is ever decoded again here. A
//! failure while embedding one image drops that page and continues — a
//! single bad stream must not cost the user the whole document.

use crate::config::JobConfig;
use crate::error::{ImageFault, Img2PdfError};
use crate::output::NormalizedImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

/// The assembled document plus per-image embed faults.
#[derive(Debug)]
pub struct AssembledDocument {
    pub pdf: Vec<u8>,
    pub page_count: usize,
    pub faults: Vec<ImageFault>,
}

/// Build the final PDF from normalized images, in input order.
///
/// # Errors
/// Fails only at the document level (serialization). Per-image embed
/// failures are recorded in [`AssembledDocument::faults`] with the page
/// omitted.
pub fn build_document(
    images: Vec<NormalizedImage>,
    config: &JobConfig,
) -> Result<AssembledDocument, Img2PdfError> {
    let total = images.len();
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    // Single shared font object for the optional page labels.
    let font_id = config.page_numbers.then(|| {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        })
    });

    let mut kids: Vec<Object> = Vec::with_capacity(total);
    let mut faults = Vec::new();

    for (index, img) in images.into_iter().enumerate() {
        let name = img.name.clone();
        match embed_page(&mut doc, pages_id, font_id, img, index, total) {
            Ok(page_id) => kids.push(page_id.into()),
            Err(detail) => {
                warn!("Skipping page for '{}': {}", name, detail);
                faults.push(ImageFault::EmbedFailed { name, detail });
            }
        }
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut pdf = Vec::new();
    doc.save_to(&mut pdf)
        .map_err(|e| Img2PdfError::Assembly(e.to_string()))?;

    debug!("Assembled {} pages, {} bytes", page_count, pdf.len());
    Ok(AssembledDocument {
        pdf,
        page_count,
        faults,
    })
}

/// Embed one image as its own page, sized and placed per its layout.
fn embed_page(
    doc: &mut Document,
    pages_id: ObjectId,
    font_id: Option<ObjectId>,
    img: NormalizedImage,
    index: usize,
    total: usize,
) -> Result<ObjectId, String> {
    let layout = img.layout;

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img.width as i64,
            "Height" => img.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        img.jpeg,
    ));

    // q/Q isolates the image transform; cm maps the unit square onto the
    // draw rectangle.
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(layout.draw_width as f32),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(layout.draw_height as f32),
                Object::Real(layout.x as f32),
                Object::Real(layout.y as f32),
            ],
        ),
        Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
        Operation::new("Q", vec![]),
    ];

    if font_id.is_some() {
        let label = format!("{}/{}", index + 1, total);
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![Object::Real(0.5); 3]),
            Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), Object::Integer(9)],
            ),
            Operation::new(
                "Td",
                vec![
                    Object::Real((layout.page_width / 2.0 - 10.0) as f32),
                    Object::Real(15.0),
                ],
            ),
            Operation::new("Tj", vec![Object::string_literal(label)]),
            Operation::new("ET", vec![]),
        ]);
    }

    let content = Content { operations }
        .encode()
        .map_err(|e| format!("content encoding failed: {e}"))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let mut resources = dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    };
    if let Some(font_id) = font_id {
        resources.set("Font", dictionary! { "F1" => font_id });
    }

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(layout.page_width as f32),
            Object::Real(layout.page_height as f32),
        ],
        "Resources" => resources,
        "Contents" => content_id,
    });

    Ok(page_id)
}
