//! # img2pdf
//!
//! Convert arbitrary user images into a paginated PDF document.
//!
//! ## Why this crate?
//!
//! Dumping images into a PDF sounds trivial until real inputs arrive:
//! transparent PNGs that turn black under a lossy re-encode, one corrupt
//! file in a 200-image batch, a user who cancels halfway, and a host that
//! cannot block while a phone-camera JPEG decodes. This crate wraps the
//! whole path — decode, white-flatten, JPEG re-encode, page layout, PDF
//! assembly, delivery — in a cancellable pipeline that reports progress
//! per image and survives bad inputs by skipping them instead of failing
//! the job.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images
//!  │
//!  ├─ 1. Normalize  decode + flatten onto white + JPEG re-encode
//!  │                (worker task, sequential, cancellable per image)
//!  ├─ 2. Layout     page size + contain-scaled placement per image
//!  ├─ 3. Assemble   one page per image via lopdf (DCTDecode embed)
//!  └─ 4. Deliver    save to disk / hand to the host viewer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2pdf::{convert, InputImage, JobConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let files = vec![InputImage::new(
//!         "photo.png",
//!         "image/png",
//!         std::fs::read("photo.png")?,
//!     )];
//!     let output = convert(files, &JobConfig::default()).await?;
//!     std::fs::write("photo.pdf", &output.pdf)?;
//!     eprintln!(
//!         "{} pages, {} images skipped",
//!         output.stats.page_count, output.stats.skipped_images
//!     );
//!     Ok(())
//! }
//! ```
//!
//! For progress events, cancellation, and platform-aware delivery, use
//! [`PipelineManager`]; for a stream-shaped frontend, [`convert_stream`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2pdf` binary (clap + anyhow + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! img2pdf = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod delivery;
pub mod error;
pub mod event;
pub mod geometry;
pub mod manager;
pub mod output;
pub mod pipeline;
pub mod stream;

mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{JobConfig, JobConfigBuilder};
pub use convert::{convert, convert_sync, convert_to_file};
pub use delivery::{Delivered, DeliveryStrategy, OpenInViewer, StandardDownload};
pub use error::{DeliveryError, ImageFault, Img2PdfError};
pub use event::{InputImage, ProgressEvent};
pub use geometry::{compute_layout, Margins, PageLayout, PageSizeMode};
pub use manager::{PipelineManager, PipelineState};
pub use output::{ConversionOutput, JobOutput, JobStats, NormalizedImage};
pub use stream::{convert_stream, JobEvent, JobHandle, JobStream};
