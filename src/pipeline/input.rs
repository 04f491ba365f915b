//! Input loading: turn user-supplied image paths into in-memory buffers.
//!
//! ## Why read everything up front?
//!
//! The worker owns its queue for the whole job — buffers move into it at
//! start and never come back. Reading files before `start` keeps all I/O
//! errors on the caller's side of the boundary, so the worker only ever
//! deals with decode failures, and a missing file fails fast instead of
//! surfacing mid-queue as a skipped image.

use crate::error::Img2PdfError;
use crate::event::InputImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Media type guessed from a file extension.
///
/// Purely informational — decoding sniffs the real format from the bytes.
/// Unknown extensions fall back to `application/octet-stream`.
pub fn media_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Load one image file into an [`InputImage`].
pub async fn load_image_file(path: impl AsRef<Path>) -> Result<InputImage, Img2PdfError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Img2PdfError::InputRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
    Ok(InputImage::new(name, media_type_for_path(path), bytes))
}

/// Load a list of image files, preserving order.
///
/// Fails on the first unreadable file — a job should not silently start
/// with fewer images than the user selected.
pub async fn load_image_files(
    paths: &[PathBuf],
) -> Result<Vec<InputImage>, Img2PdfError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(load_image_file(path).await?);
    }
    Ok(files)
}
