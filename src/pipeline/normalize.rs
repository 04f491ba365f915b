//! Image normalization: decode, flatten onto white, JPEG re-encode, and
//! attach the page layout.
//!
//! ## Why flatten onto white?
//!
//! The output stream is always JPEG, which has no alpha channel. A PNG with
//! transparency decoded straight to RGB renders its transparent region as
//! black. Compositing onto an opaque white canvas first gives the result a
//! print-like background instead.
//!
//! ## Why always JPEG?
//!
//! One codec path keeps the embedded page streams uniform (every page is a
//! DCTDecode XObject) and makes output size proportional to the configured
//! quality rather than to whatever format the user happened to upload.

use crate::config::JobConfig;
use crate::error::ImageFault;
use crate::event::InputImage;
use crate::geometry;
use crate::output::NormalizedImage;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

/// Normalize one input image.
///
/// CPU-bound; the worker calls this through `spawn_blocking`. A failure at
/// any step is an [`ImageFault`] — the caller skips the image and continues
/// with the rest of the queue.
pub fn normalize_image(
    file: InputImage,
    config: &JobConfig,
) -> Result<NormalizedImage, ImageFault> {
    let decoded = image::load_from_memory(&file.bytes).map_err(|e| ImageFault::DecodeFailed {
        name: file.name.clone(),
        detail: e.to_string(),
    })?;

    let width = decoded.width();
    let height = decoded.height();
    debug!(
        "Decoded '{}' ({}): {}x{} px",
        file.name, file.media_type, width, height
    );

    let layout = geometry::compute_layout(
        f64::from(width),
        f64::from(height),
        config.page_size,
        config.margins,
    );

    let jpeg =
        flatten_to_jpeg(&decoded, config.jpeg_quality).map_err(|e| ImageFault::EncodeFailed {
            name: file.name.clone(),
            detail: e.to_string(),
        })?;

    debug!(
        "Normalized '{}': {} raw → {} JPEG bytes",
        file.name,
        file.bytes.len(),
        jpeg.len()
    );

    Ok(NormalizedImage {
        name: file.name,
        width,
        height,
        jpeg,
        layout,
    })
}

/// Composite onto an opaque white canvas and encode as JPEG.
fn flatten_to_jpeg(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, image::ImageError> {
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();

    // image's encoder takes quality 1–100; the config exposes the 0.0–1.0
    // scale hosts are used to.
    let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, q);
    rgb.write_with_encoder(encoder)?;
    Ok(buf)
}
