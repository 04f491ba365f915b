//! Configuration types for image-to-PDF conversion.
//!
//! All job behaviour is controlled through [`JobConfig`], built via its
//! [`JobConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to ship the config across the worker channel, serialise it for logging,
//! and diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A positional constructor breaks on every new field. The builder lets
//! callers set only what they care about and rely on documented defaults
//! for the rest.

use crate::error::Img2PdfError;
use crate::geometry::{Margins, PageSizeMode};
use serde::{Deserialize, Serialize};

/// Configuration for one conversion job.
///
/// Built via [`JobConfig::builder()`] or [`JobConfig::default()`].
///
/// # Example
/// ```rust
/// use img2pdf::{JobConfig, PageSizeMode};
///
/// let config = JobConfig::builder()
///     .page_size(PageSizeMode::A4)
///     .margins_mm(10.0)
///     .jpeg_quality(0.85)
///     .file_name("scans.pdf")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Page sizing mode. Default: [`PageSizeMode::A4`].
    pub page_size: PageSizeMode,

    /// Page margins in millimetres. Default: 0 on all sides.
    ///
    /// Zero margins give full-bleed pages — the common case for photo
    /// dumps. Margins are converted to points inside the geometry step;
    /// nothing else in the pipeline ever sees millimetres.
    pub margins: Margins,

    /// JPEG re-encode quality, 0.0–1.0. Default: 0.92.
    ///
    /// Every input is flattened onto a white backing and re-encoded as
    /// JPEG regardless of source format — one codec path keeps the
    /// embedded streams uniform and the output size predictable. 0.92 is
    /// visually lossless for photographic content while still shrinking
    /// oversized phone-camera inputs substantially.
    pub jpeg_quality: f32,

    /// Base name for the delivered document. When `None`, a name derived
    /// from the image count is used (`images-{n}.pdf`).
    pub file_name: Option<String>,

    /// Stamp an "i/N" page label near the bottom center of every page.
    /// Default: false.
    pub page_numbers: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            page_size: PageSizeMode::default(),
            margins: Margins::default(),
            jpeg_quality: 0.92,
            file_name: None,
            page_numbers: false,
        }
    }
}

impl JobConfig {
    /// Create a new builder for `JobConfig`.
    pub fn builder() -> JobConfigBuilder {
        JobConfigBuilder {
            config: Self::default(),
        }
    }

    /// The output file name, falling back to a count-derived default.
    pub fn resolved_file_name(&self, image_count: usize) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("images-{image_count}.pdf"))
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn page_size(mut self, mode: PageSizeMode) -> Self {
        self.config.page_size = mode;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.config.margins = margins;
        self
    }

    /// Equal margins on all four sides, in millimetres.
    pub fn margins_mm(mut self, mm: f64) -> Self {
        self.config.margins = Margins::uniform(mm);
        self
    }

    pub fn jpeg_quality(mut self, quality: f32) -> Self {
        self.config.jpeg_quality = quality.clamp(0.0, 1.0);
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = Some(name.into());
        self
    }

    pub fn page_numbers(mut self, enabled: bool) -> Self {
        self.config.page_numbers = enabled;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<JobConfig, Img2PdfError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.jpeg_quality) {
            return Err(Img2PdfError::InvalidConfig(format!(
                "jpeg_quality must be 0.0–1.0, got {}",
                c.jpeg_quality
            )));
        }
        let m = c.margins;
        if [m.top, m.right, m.bottom, m.left]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(Img2PdfError::InvalidConfig(format!(
                "margins must be finite and non-negative, got {m:?}"
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_values() {
        let c = JobConfig::default();
        assert_eq!(c.page_size, PageSizeMode::A4);
        assert_eq!(c.margins, Margins::default());
        assert!((c.jpeg_quality - 0.92).abs() < f32::EPSILON);
        assert!(c.file_name.is_none());
        assert!(!c.page_numbers);
    }

    #[test]
    fn builder_clamps_quality() {
        let c = JobConfig::builder().jpeg_quality(7.5).build().unwrap();
        assert!((c.jpeg_quality - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn negative_margins_rejected() {
        let err = JobConfig::builder()
            .margins(Margins {
                top: -1.0,
                right: 0.0,
                bottom: 0.0,
                left: 0.0,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, Img2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn file_name_falls_back_to_count() {
        let c = JobConfig::default();
        assert_eq!(c.resolved_file_name(3), "images-3.pdf");
        let named = JobConfig::builder().file_name("out.pdf").build().unwrap();
        assert_eq!(named.resolved_file_name(3), "out.pdf");
    }

    #[test]
    fn config_round_trips_through_serde() {
        let c = JobConfig::builder()
            .page_size(PageSizeMode::OriginalSize)
            .margins_mm(12.5)
            .build()
            .unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: JobConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.page_size, PageSizeMode::OriginalSize);
        assert_eq!(back.margins, Margins::uniform(12.5));
    }
}
