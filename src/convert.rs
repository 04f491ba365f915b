//! Eager (full-job) conversion entry points.
//!
//! ## Why eager vs. the manager?
//!
//! This module provides the simpler API: normalize everything, assemble,
//! and return the bytes. No worker lifecycle, no callbacks, no delivery —
//! the caller gets the PDF and decides what to do with it. Use
//! [`crate::manager::PipelineManager`] instead when you need progress
//! events, cancellation, or platform-aware delivery, and
//! [`crate::stream::convert_stream`] for a stream-shaped frontend to the
//! same worker.

use crate::config::JobConfig;
use crate::error::Img2PdfError;
use crate::event::InputImage;
use crate::output::{ConversionOutput, JobStats};
use crate::pipeline::{assemble, normalize};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Convert a list of images to a single PDF, one page per image.
///
/// Images are processed strictly in input order; a corrupt image is
/// skipped (and reported in `faults`), not fatal.
///
/// # Errors
/// Fails only when nothing could be produced: empty input, every image
/// faulted, or document-level assembly failure.
pub async fn convert(
    files: Vec<InputImage>,
    config: &JobConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    if files.is_empty() {
        return Err(Img2PdfError::EmptyJob);
    }

    let total_start = Instant::now();
    let total = files.len();
    info!("Converting {} images", total);

    // ── Normalize, one image at a time ───────────────────────────────────
    let normalize_start = Instant::now();
    let mut images = Vec::with_capacity(total);
    let mut faults = Vec::new();
    for file in files {
        let cfg = config.clone();
        match tokio::task::spawn_blocking(move || normalize::normalize_image(file, &cfg))
            .await
            .map_err(|e| Img2PdfError::Internal(format!("normalize task panicked: {e}")))?
        {
            Ok(normalized) => images.push(normalized),
            Err(fault) => {
                warn!("Skipping image: {}", fault);
                faults.push(fault);
            }
        }
    }
    let normalize_duration_ms = normalize_start.elapsed().as_millis() as u64;

    if images.is_empty() {
        let first_fault = faults
            .first()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "no faults recorded".into());
        return Err(Img2PdfError::AllImagesFailed { total, first_fault });
    }
    let processed = images.len();

    // ── Assemble ─────────────────────────────────────────────────────────
    let assembly_start = Instant::now();
    let cfg = config.clone();
    let assembled = tokio::task::spawn_blocking(move || assemble::build_document(images, &cfg))
        .await
        .map_err(|e| Img2PdfError::Internal(format!("assembly task panicked: {e}")))??;
    let assembly_duration_ms = assembly_start.elapsed().as_millis() as u64;

    faults.extend(assembled.faults);

    let stats = JobStats {
        total_images: total,
        processed_images: processed,
        skipped_images: total - processed,
        page_count: assembled.page_count,
        pdf_bytes: assembled.pdf.len(),
        normalize_duration_ms,
        assembly_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {}/{} images, {} pages, {}ms",
        processed, total, stats.page_count, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        pdf: assembled.pdf,
        faults,
        stats,
    })
}

/// Convert images and write the PDF directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    files: Vec<InputImage>,
    output_path: impl AsRef<Path>,
    config: &JobConfig,
) -> Result<JobStats, Img2PdfError> {
    let output = convert(files, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Img2PdfError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.pdf)
        .await
        .map_err(|e| Img2PdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Img2PdfError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    files: Vec<InputImage>,
    config: &JobConfig,
) -> Result<ConversionOutput, Img2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2PdfError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(convert(files, config))
}
