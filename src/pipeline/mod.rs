//! Pipeline stages for image-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different PDF backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ assemble
//! (bytes)  (white-flatten  (one page per
//!           + JPEG + layout)  image, lopdf)
//! ```
//!
//! 1. [`input`]     — load image files into [`crate::InputImage`] buffers
//! 2. [`normalize`] — decode, flatten onto white, JPEG re-encode, attach the
//!    page layout; runs on the blocking pool because codec work is CPU-bound
//! 3. [`assemble`]  — build the final document, one page per normalized
//!    image, sized and placed exactly as the layout says

pub mod assemble;
pub mod input;
pub mod normalize;
