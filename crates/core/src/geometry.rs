//! PDF user space to overlay pixel mapping
//!
//! The overlay uses a top-left origin with y growing downward; PDF user space
//! has its origin bottom-left. A run's transform carries its font height in
//! the first column, its baseline origin in the translation.

use crate::config::OverlayConfig;
use crate::measure::TextMeasurer;
use pdf_engine::{PageSize, TextRun};
use serde::{Deserialize, Serialize};

/// Render scale and pixel size of the page for one derivation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportGeometry {
    /// Rendered pixel width divided by native page width
    pub scale: f32,
    pub width_px: f32,
    pub height_px: f32,
}

impl ViewportGeometry {
    /// Geometry that renders `page` at `target_width` pixels wide
    ///
    /// `None` when either width is non-positive or not finite.
    pub fn fit_width(page: PageSize, target_width: f32) -> Option<Self> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        if !usable(target_width) || !usable(page.width_pt) {
            return None;
        }
        let scale = target_width / page.width_pt;
        let (width_px, height_px) = page.viewport(scale);
        Some(Self { scale, width_px, height_px })
    }
}

/// Pixel placement of one text run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    pub left_px: f32,
    pub top_px: f32,
    pub font_size_px: f32,
    /// Length of the transform's first column
    pub font_height_pdf: f32,
    pub width_px: f32,
    pub scale_x: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryMapper {
    pub baseline_ratio: f32,
    pub min_stretch: f32,
    pub max_stretch: f32,
}

impl Default for GeometryMapper {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl GeometryMapper {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            baseline_ratio: config.baseline_ratio,
            min_stretch: config.min_stretch,
            max_stretch: config.max_stretch,
        }
    }

    /// Place `run` on a page rendered at `scale` with `viewport_height_px` rows
    ///
    /// Never fails; degenerate transforms give a zero-size placement.
    pub fn place(
        &self,
        run: &TextRun,
        scale: f32,
        viewport_height_px: f32,
        measurer: &dyn TextMeasurer,
    ) -> GlyphPlacement {
        let [a, b, _, _, e, f] = run.transform.to_array().map(finite_or_zero);
        let scale = finite_or_zero(scale);
        let viewport_height_px = finite_or_zero(viewport_height_px);

        let font_height_pdf = (a * a + b * b).sqrt();
        let font_size_px = font_height_pdf * scale;
        let left_px = e * scale;
        let top_px = viewport_height_px - f * scale - font_size_px * self.baseline_ratio;
        let width_px = (finite_or_zero(run.width) * scale).max(0.0);

        let measured = measurer.measure(&run.text, font_size_px);
        let scale_x = self.stretch(width_px, measured);

        GlyphPlacement { left_px, top_px, font_size_px, font_height_pdf, width_px, scale_x }
    }

    /// Horizontal stretch fitting `measured` onto `declared`
    ///
    /// 1 when nothing was measured, otherwise clamped to the stretch range.
    pub fn stretch(&self, declared: f32, measured: f32) -> f32 {
        if !measured.is_finite() || measured <= 0.0 {
            return 1.0;
        }
        let ratio = declared / measured;
        if !ratio.is_finite() {
            return 1.0;
        }
        ratio.clamp(self.min_stretch, self.max_stretch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::SansSerifMeasurer;
    use pdf_engine::Matrix;

    fn run(text: &str, transform: [f32; 6], width: f32) -> TextRun {
        TextRun::new(text, Matrix::from_array(transform), width, "F1")
    }

    #[test]
    fn test_place_fixed_transform() {
        let mapper = GeometryMapper::default();
        let fixed = |_: &str, size: f32| size * 4.0;
        let placement = mapper.place(&run("Text", [10.0, 0.0, 0.0, 10.0, 100.0, 200.0], 40.0), 2.0, 500.0, &fixed);

        assert_eq!(placement.font_height_pdf, 10.0);
        assert_eq!(placement.font_size_px, 20.0);
        assert_eq!(placement.left_px, 200.0);
        assert!((placement.top_px - 84.0).abs() < 1e-4);
        assert_eq!(placement.width_px, 80.0);
        // measured 80 px, declared 80 px
        assert_eq!(placement.scale_x, 1.0);
    }

    #[test]
    fn test_rotated_font_height_uses_first_column() {
        let mapper = GeometryMapper::default();
        let placement = mapper.place(&run("x", [6.0, 8.0, -8.0, 6.0, 0.0, 0.0], 5.0), 1.0, 100.0, &SansSerifMeasurer);
        assert!((placement.font_height_pdf - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_defaults_stretch_to_one() {
        let mapper = GeometryMapper::default();
        let placement = mapper.place(&run("", [12.0, 0.0, 0.0, 12.0, 10.0, 10.0], 30.0), 1.5, 800.0, &SansSerifMeasurer);
        assert_eq!(placement.scale_x, 1.0);
    }

    #[test]
    fn test_stretch_is_clamped() {
        let mapper = GeometryMapper::default();
        assert_eq!(mapper.stretch(100.0, 10.0), 4.0);
        assert_eq!(mapper.stretch(1.0, 10.0), 0.25);
        assert_eq!(mapper.stretch(15.0, 10.0), 1.5);
        assert_eq!(mapper.stretch(15.0, 0.0), 1.0);
        assert_eq!(mapper.stretch(15.0, f32::NAN), 1.0);
    }

    #[test]
    fn test_degenerate_transform_yields_zero_size() {
        let mapper = GeometryMapper::default();
        let placement = mapper.place(&run("a", [0.0, 0.0, 0.0, 0.0, f32::NAN, 50.0], f32::INFINITY), 2.0, 300.0, &SansSerifMeasurer);

        assert_eq!(placement.font_size_px, 0.0);
        assert_eq!(placement.left_px, 0.0);
        assert_eq!(placement.top_px, 200.0);
        assert_eq!(placement.width_px, 0.0);
        assert_eq!(placement.scale_x, 1.0);
    }

    #[test]
    fn test_fit_width() {
        let page = PageSize { width_pt: 600.0, height_pt: 800.0 };
        let geometry = ViewportGeometry::fit_width(page, 1200.0).unwrap();
        assert_eq!(geometry, ViewportGeometry { scale: 2.0, width_px: 1200.0, height_px: 1600.0 });

        assert!(ViewportGeometry::fit_width(page, 0.0).is_none());
        assert!(ViewportGeometry::fit_width(page, f32::NAN).is_none());
        assert!(ViewportGeometry::fit_width(PageSize { width_pt: 0.0, height_pt: 10.0 }, 100.0).is_none());
    }
}
