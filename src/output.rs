//! Output types: normalized images, job statistics, and results.

use crate::delivery::Delivered;
use crate::error::ImageFault;
use crate::geometry::PageLayout;
use serde::{Deserialize, Serialize};

/// One input image after normalization: flattened onto white, re-encoded
/// as JPEG, and annotated with its page layout.
///
/// Produced by the worker, consumed read-only by the assembly step, and
/// dropped once the document is built. The original raw bytes are gone by
/// this point — `jpeg` is the only pixel data kept alive, which is what
/// bounds peak memory on large queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedImage {
    /// Original input name (for logging and fault reports).
    pub name: String,
    /// Source pixel width before any scaling.
    pub width: u32,
    /// Source pixel height before any scaling.
    pub height: u32,
    /// Re-encoded JPEG bytes, embedded verbatim into the PDF (DCTDecode).
    #[serde(with = "crate::event::serde_bytes_b64")]
    pub jpeg: Vec<u8>,
    /// Page size and draw placement computed from the source dimensions.
    pub layout: PageLayout,
}

/// Statistics for one conversion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    /// Images submitted.
    pub total_images: usize,
    /// Images that normalized successfully.
    pub processed_images: usize,
    /// Images skipped due to per-image faults.
    pub skipped_images: usize,
    /// Pages in the final document (may be below `processed_images` if an
    /// embed failed during assembly).
    pub page_count: usize,
    /// Size of the produced PDF in bytes.
    pub pdf_bytes: usize,
    /// Wall-clock time spent normalizing images.
    pub normalize_duration_ms: u64,
    /// Wall-clock time spent assembling the PDF.
    pub assembly_duration_ms: u64,
    /// Total job duration.
    pub total_duration_ms: u64,
}

/// Result of an eager [`crate::convert`] call: the document plus everything
/// a caller needs to report partial success.
#[derive(Debug)]
pub struct ConversionOutput {
    /// The assembled PDF.
    pub pdf: Vec<u8>,
    /// Per-image faults for skipped inputs (empty on full success).
    pub faults: Vec<ImageFault>,
    /// Job statistics.
    pub stats: JobStats,
}

/// What the manager hands to the `on_complete` callback after delivery.
#[derive(Debug)]
pub struct JobOutput {
    /// File name the document was delivered under.
    pub file_name: String,
    /// Where the delivery strategy put the document.
    pub delivered: Delivered,
    /// Per-image faults for skipped inputs.
    pub faults: Vec<ImageFault>,
    /// Job statistics.
    pub stats: JobStats,
}
