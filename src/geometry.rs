//! Page geometry: given an image's pixel dimensions, a page-size mode, and
//! margins, compute the page dimensions and the placement of the image on
//! that page.
//!
//! ## Why a free function?
//!
//! Both the worker (which annotates every normalized image with its layout)
//! and the final assembly step depend on this computation. Keeping it a pure
//! `f64 → f64` function with no state guarantees the two sides agree exactly:
//! identical inputs produce bit-identical output, so the preview path and the
//! embedded page can never drift apart.
//!
//! All page math happens in PDF points. Margins arrive in millimetres and
//! are converted up front (1 mm = 2.83465 pt).

use serde::{Deserialize, Serialize};

/// Conversion factor from millimetres to PDF points.
pub const MM_TO_PT: f64 = 2.834_65;

/// A4 portrait width in points.
pub const A4_WIDTH_PT: f64 = 595.28;

/// A4 portrait height in points.
pub const A4_HEIGHT_PT: f64 = 841.89;

/// Side length of the square reference page used by [`PageSizeMode::FitScreen`].
const FIT_SCREEN_SIDE_PT: f64 = 600.0;

/// How the page for each image is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageSizeMode {
    /// Fixed A4 portrait page; the image is contained and centered. (default)
    #[default]
    A4,
    /// Page sized to the image itself. Images wider than an A4 page (minus
    /// horizontal margins) are downscaled to fit that width; smaller images
    /// keep their native size. Page = scaled image + margins.
    OriginalSize,
    /// Fixed square reference page, contained and centered like `A4`.
    FitScreen,
}

/// Page margins in millimetres. Default is 0 on every side (full-bleed).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    /// Equal margins on all four sides.
    pub fn uniform(mm: f64) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }
}

/// Placement of one image on its page, in points.
///
/// The draw rectangle `(x, y, draw_width, draw_height)` is always fully
/// contained within the page minus margins, and preserves the source aspect
/// ratio (contain semantics — letterboxed, never stretched or cropped).
/// The origin follows PDF conventions: `(x, y)` is the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_width: f64,
    pub page_height: f64,
    pub draw_width: f64,
    pub draw_height: f64,
    pub x: f64,
    pub y: f64,
}

/// Compute the page size and image placement for one image.
///
/// `img_width`/`img_height` are source pixel dimensions. A zero dimension
/// would make the contain scale divide by zero; the scale clamps to 1.0
/// instead, yielding a degenerate (zero-area) draw rectangle rather than a
/// NaN-poisoned layout.
pub fn compute_layout(
    img_width: f64,
    img_height: f64,
    mode: PageSizeMode,
    margins: Margins,
) -> PageLayout {
    let margin_top = margins.top * MM_TO_PT;
    let margin_right = margins.right * MM_TO_PT;
    let margin_bottom = margins.bottom * MM_TO_PT;
    let margin_left = margins.left * MM_TO_PT;

    if mode == PageSizeMode::OriginalSize {
        // Page wraps the (possibly downscaled) image. Oversized images are
        // limited to the A4 content width; small images keep native size.
        let max_width = A4_WIDTH_PT - margin_left - margin_right;
        let scale = if img_width > 0.0 {
            (max_width / img_width).min(1.0)
        } else {
            1.0
        };

        let draw_width = img_width * scale;
        let draw_height = img_height * scale;
        let page_width = draw_width + margin_left + margin_right;
        let page_height = draw_height + margin_top + margin_bottom;

        return PageLayout {
            page_width,
            page_height,
            draw_width,
            draw_height,
            // Degenerate centering: the page was sized to fit the image.
            x: margin_left + (page_width - margin_left - margin_right - draw_width) / 2.0,
            y: margin_bottom + (page_height - margin_top - margin_bottom - draw_height) / 2.0,
        };
    }

    let (page_width, page_height) = match mode {
        PageSizeMode::A4 => (A4_WIDTH_PT, A4_HEIGHT_PT),
        PageSizeMode::FitScreen => (FIT_SCREEN_SIDE_PT, FIT_SCREEN_SIDE_PT),
        PageSizeMode::OriginalSize => unreachable!("handled above"),
    };

    let available_width = page_width - margin_left - margin_right;
    let available_height = page_height - margin_top - margin_bottom;

    // Contain: scale to fit the available area while preserving aspect ratio.
    let scale = if img_width > 0.0 && img_height > 0.0 {
        (available_width / img_width).min(available_height / img_height)
    } else {
        1.0
    };
    let draw_width = img_width * scale;
    let draw_height = img_height * scale;

    PageLayout {
        page_width,
        page_height,
        draw_width,
        draw_height,
        x: margin_left + (available_width - draw_width) / 2.0,
        y: margin_bottom + (available_height - draw_height) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_contained(layout: &PageLayout, margins: Margins) {
        let ml = margins.left * MM_TO_PT;
        let mr = margins.right * MM_TO_PT;
        let mt = margins.top * MM_TO_PT;
        let mb = margins.bottom * MM_TO_PT;
        assert!(layout.x >= ml - EPS, "x {} under left margin", layout.x);
        assert!(layout.y >= mb - EPS, "y {} under bottom margin", layout.y);
        assert!(
            layout.x + layout.draw_width <= layout.page_width - mr + EPS,
            "draw rect exceeds right margin"
        );
        assert!(
            layout.y + layout.draw_height <= layout.page_height - mt + EPS,
            "draw rect exceeds top margin"
        );
    }

    fn assert_aspect_preserved(layout: &PageLayout, img_w: f64, img_h: f64) {
        let src = img_w / img_h;
        let out = layout.draw_width / layout.draw_height;
        assert!(
            (src - out).abs() < 1e-6,
            "aspect ratio changed: {src} → {out}"
        );
    }

    #[test]
    fn a4_landscape_image_contained_and_centered() {
        let layout = compute_layout(2000.0, 1000.0, PageSizeMode::A4, Margins::default());
        assert_eq!(layout.page_width, A4_WIDTH_PT);
        assert_eq!(layout.page_height, A4_HEIGHT_PT);
        assert_contained(&layout, Margins::default());
        assert_aspect_preserved(&layout, 2000.0, 1000.0);
        // Width-limited: the image spans the full page width.
        assert!((layout.draw_width - A4_WIDTH_PT).abs() < EPS);
        assert!((layout.x).abs() < EPS);
        // Vertically centered.
        let expected_y = (A4_HEIGHT_PT - layout.draw_height) / 2.0;
        assert!((layout.y - expected_y).abs() < EPS);
    }

    #[test]
    fn a4_with_margins_centers_in_available_area() {
        let margins = Margins::uniform(10.0);
        let layout = compute_layout(1000.0, 1000.0, PageSizeMode::A4, margins);

        let m = 10.0 * MM_TO_PT; // 28.3465 pt
        let avail_w = A4_WIDTH_PT - 2.0 * m;
        let avail_h = A4_HEIGHT_PT - 2.0 * m;
        assert_contained(&layout, margins);

        // Draw rect center must coincide with the available-area center.
        let center_x = layout.x + layout.draw_width / 2.0;
        let center_y = layout.y + layout.draw_height / 2.0;
        assert!((center_x - (m + avail_w / 2.0)).abs() < EPS);
        assert!((center_y - (m + avail_h / 2.0)).abs() < EPS);
    }

    #[test]
    fn fit_screen_uses_square_reference_page() {
        let layout = compute_layout(300.0, 300.0, PageSizeMode::FitScreen, Margins::default());
        assert_eq!(layout.page_width, 600.0);
        assert_eq!(layout.page_height, 600.0);
        // Square image on square page fills it entirely.
        assert!((layout.draw_width - 600.0).abs() < EPS);
        assert!((layout.draw_height - 600.0).abs() < EPS);
    }

    #[test]
    fn original_size_small_image_keeps_native_dimensions() {
        let layout = compute_layout(200.0, 100.0, PageSizeMode::OriginalSize, Margins::default());
        assert!((layout.draw_width - 200.0).abs() < EPS);
        assert!((layout.draw_height - 100.0).abs() < EPS);
        assert!((layout.page_width - 200.0).abs() < EPS);
        assert!((layout.page_height - 100.0).abs() < EPS);
        assert!((layout.x).abs() < EPS);
        assert!((layout.y).abs() < EPS);
    }

    #[test]
    fn original_size_wide_image_downscales_to_content_width() {
        let layout = compute_layout(5000.0, 2500.0, PageSizeMode::OriginalSize, Margins::default());
        assert!((layout.draw_width - A4_WIDTH_PT).abs() < EPS);
        assert_aspect_preserved(&layout, 5000.0, 2500.0);
    }

    #[test]
    fn original_size_margins_grow_the_page() {
        let margins = Margins::uniform(5.0);
        let layout = compute_layout(100.0, 100.0, PageSizeMode::OriginalSize, margins);
        let m = 5.0 * MM_TO_PT;
        assert!((layout.page_width - (100.0 + 2.0 * m)).abs() < EPS);
        assert!((layout.page_height - (100.0 + 2.0 * m)).abs() < EPS);
        assert!((layout.x - m).abs() < EPS);
        assert!((layout.y - m).abs() < EPS);
        assert_contained(&layout, margins);
    }

    #[test]
    fn zero_dimension_does_not_panic_or_poison() {
        for mode in [
            PageSizeMode::A4,
            PageSizeMode::OriginalSize,
            PageSizeMode::FitScreen,
        ] {
            let layout = compute_layout(0.0, 0.0, mode, Margins::uniform(10.0));
            assert!(layout.page_width.is_finite());
            assert!(layout.page_height.is_finite());
            assert!(layout.draw_width.is_finite());
            assert!(layout.draw_height.is_finite());
            assert!(layout.x.is_finite());
            assert!(layout.y.is_finite());
            assert_eq!(layout.draw_width, 0.0);
        }
    }

    #[test]
    fn identical_inputs_yield_bit_identical_output() {
        let margins = Margins {
            top: 3.7,
            right: 1.2,
            bottom: 9.9,
            left: 0.1,
        };
        let a = compute_layout(1234.0, 777.0, PageSizeMode::A4, margins);
        let b = compute_layout(1234.0, 777.0, PageSizeMode::A4, margins);
        assert_eq!(a.page_width.to_bits(), b.page_width.to_bits());
        assert_eq!(a.page_height.to_bits(), b.page_height.to_bits());
        assert_eq!(a.draw_width.to_bits(), b.draw_width.to_bits());
        assert_eq!(a.draw_height.to_bits(), b.draw_height.to_bits());
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
    }

    #[test]
    fn aspect_preserved_across_modes_and_margins() {
        let cases = [(640.0, 480.0), (480.0, 640.0), (3000.0, 1000.0)];
        for (w, h) in cases {
            for mode in [
                PageSizeMode::A4,
                PageSizeMode::OriginalSize,
                PageSizeMode::FitScreen,
            ] {
                for m in [Margins::default(), Margins::uniform(15.0)] {
                    let layout = compute_layout(w, h, mode, m);
                    assert_aspect_preserved(&layout, w, h);
                    assert_contained(&layout, m);
                }
            }
        }
    }
}
