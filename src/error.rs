//! Error types for the img2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2PdfError`] — **Fatal**: the job cannot proceed or produced
//!   nothing (double start, worker crash, delivery failure). Returned as
//!   `Err(Img2PdfError)` from the top-level APIs and surfaced through the
//!   manager's error callback.
//!
//! * [`ImageFault`] — **Non-fatal**: a single image failed (corrupt bytes,
//!   encoder glitch) but the rest of the queue is fine. Stored inside the
//!   completion payload so callers can inspect partial success rather than
//!   losing the whole document to one bad input.
//!
//! The separation lets callers decide their own tolerance: abort when any
//! image fails, log and continue, or report faults after the run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the img2pdf library.
///
/// Per-image failures use [`ImageFault`] and are carried in the completion
/// payload rather than propagated here.
#[derive(Debug, Error)]
pub enum Img2PdfError {
    // ── Job admission ─────────────────────────────────────────────────────
    /// A job is already active; the pipeline never queues a second one.
    #[error("a conversion job is already in progress; cancel it or wait for its terminal event")]
    AlreadyProcessing,

    /// The submitted file list was empty.
    #[error("no input images were provided")]
    EmptyJob,

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An input image file could not be read.
    #[error("failed to read input file '{path}': {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Worker results ────────────────────────────────────────────────────
    /// The completion payload does not account for every submitted image.
    #[error("malformed worker result: expected {expected} images accounted for, got {got}")]
    MalformedResult { expected: usize, got: usize },

    /// Every image in the queue failed; there is nothing to assemble.
    #[error("all {total} images failed to process\nFirst fault: {first_fault}")]
    AllImagesFailed { total: usize, first_fault: String },

    /// The worker task crashed or its channel closed without a terminal event.
    #[error("worker fault: {0}")]
    WorkerFault(String),

    // ── Assembly / delivery ───────────────────────────────────────────────
    /// Document-level assembly failure (content encoding, serialization).
    #[error("PDF assembly failed: {0}")]
    Assembly(String),

    /// The delivery strategy could not hand the document to the user.
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// Could not write the output PDF file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// Recorded in the completion payload when an image fails. The job
/// continues unless ALL images fail.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ImageFault {
    /// The source bytes could not be decoded as an image.
    #[error("image '{name}': decode failed: {detail}")]
    DecodeFailed { name: String, detail: String },

    /// Re-encoding to JPEG failed.
    #[error("image '{name}': JPEG encode failed: {detail}")]
    EncodeFailed { name: String, detail: String },

    /// Embedding the normalized image into the document failed; its page
    /// was omitted.
    #[error("image '{name}': page embed failed: {detail}")]
    EmbedFailed { name: String, detail: String },
}

impl ImageFault {
    /// Name of the input image this fault refers to.
    pub fn image_name(&self) -> &str {
        match self {
            ImageFault::DecodeFailed { name, .. }
            | ImageFault::EncodeFailed { name, .. }
            | ImageFault::EmbedFailed { name, .. } => name,
        }
    }
}

/// Errors raised by a [`crate::delivery::DeliveryStrategy`].
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The host environment refused the automatic delivery mechanism.
    /// `hint` is a user-presentable instruction for the manual fallback.
    #[error("delivery blocked by the host environment: {hint}")]
    Blocked { hint: String },

    /// Writing the artifact failed.
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_result_display() {
        let e = Img2PdfError::MalformedResult {
            expected: 5,
            got: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("expected 5"), "got: {msg}");
        assert!(msg.contains("got 3"), "got: {msg}");
    }

    #[test]
    fn all_images_failed_display() {
        let e = Img2PdfError::AllImagesFailed {
            total: 4,
            first_fault: "image 'a.png': decode failed: bad header".into(),
        };
        assert!(e.to_string().contains("all 4 images"));
        assert!(e.to_string().contains("a.png"));
    }

    #[test]
    fn fault_names_are_accessible() {
        let f = ImageFault::DecodeFailed {
            name: "photo.webp".into(),
            detail: "truncated".into(),
        };
        assert_eq!(f.image_name(), "photo.webp");
        assert!(f.to_string().contains("photo.webp"));
    }

    #[test]
    fn delivery_blocked_carries_hint() {
        let e = DeliveryError::Blocked {
            hint: "open the file manually from the share sheet".into(),
        };
        assert!(e.to_string().contains("share sheet"));
    }
}
