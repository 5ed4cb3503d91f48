//! Removal of artificial spacing runs
//!
//! PDF producers often emit a lone space only to move the pen between words.
//! Painted in the overlay such a run becomes an oversized phantom gap, so any
//! single-space run narrower than `min_space_ratio` font sizes is dropped.

use crate::config::OverlayConfig;
use pdf_engine::{TextContentItem, TextRun};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunFilter {
    pub min_space_ratio: f32,
}

impl Default for RunFilter {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

impl RunFilter {
    pub fn new(min_space_ratio: f32) -> Self {
        Self { min_space_ratio }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(config.min_space_ratio)
    }

    /// Whether `run` survives the filter
    ///
    /// The width / font-size ratio does not depend on the render scale, so it
    /// is evaluated in PDF units. The font size is `|d|` of the transform.
    pub fn keeps(&self, run: &TextRun) -> bool {
        if run.text != " " {
            return true;
        }
        let font_size = run.transform.d.abs();
        if !font_size.is_finite() || font_size == 0.0 {
            return false;
        }
        run.width / font_size >= self.min_space_ratio
    }

    /// Retained runs in content order; marker items are skipped
    pub fn apply(&self, items: Vec<TextContentItem>) -> Vec<TextRun> {
        let total = items.len();
        let runs: Vec<TextRun> = items
            .into_iter()
            .filter_map(TextContentItem::into_run)
            .filter(|run| self.keeps(run))
            .collect();
        log::debug!("run filter kept {} of {total} item(s)", runs.len());
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_engine::{MarkedContent, Matrix};

    fn space(width: f32, size: f32) -> TextRun {
        TextRun::new(" ", Matrix::new(size, 0.0, 0.0, size, 0.0, 0.0), width, "F1")
    }

    #[test]
    fn test_narrow_space_dropped() {
        assert!(!RunFilter::default().keeps(&space(1.0, 10.0)));
    }

    #[test]
    fn test_wide_space_retained() {
        assert!(RunFilter::default().keeps(&space(25.0, 10.0)));
        // boundary is inclusive
        assert!(RunFilter::default().keeps(&space(20.0, 10.0)));
    }

    #[test]
    fn test_negative_d_uses_magnitude() {
        let run = TextRun::new(" ", Matrix::new(10.0, 0.0, 0.0, -10.0, 0.0, 0.0), 25.0, "F1");
        assert!(RunFilter::default().keeps(&run));
    }

    #[test]
    fn test_zero_size_space_dropped() {
        assert!(!RunFilter::default().keeps(&space(5.0, 0.0)));
    }

    #[test]
    fn test_other_content_passes() {
        let filter = RunFilter::default();
        let narrow = |text: &str| TextRun::new(text, Matrix::new(10.0, 0.0, 0.0, 10.0, 0.0, 0.0), 0.1, "F1");

        assert!(filter.keeps(&narrow("a")));
        assert!(filter.keeps(&narrow("  ")));
        assert!(filter.keeps(&narrow("a ")));
        assert!(filter.keeps(&narrow("")));
    }

    #[test]
    fn test_apply_preserves_order_and_skips_markers() {
        let items = vec![
            TextContentItem::Marker(MarkedContent::Begin { tag: "Span".into() }),
            TextContentItem::Run(TextRun::new("Hello", Matrix::new(10.0, 0.0, 0.0, 10.0, 0.0, 0.0), 22.0, "F1")),
            TextContentItem::Run(space(3.0, 10.0)),
            TextContentItem::Marker(MarkedContent::End),
            TextContentItem::Run(TextRun::new("world", Matrix::new(10.0, 0.0, 0.0, 10.0, 25.0, 0.0), 24.0, "F1")),
            TextContentItem::Run(space(30.0, 10.0)),
        ];

        let texts: Vec<String> = RunFilter::new(2.0).apply(items).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["Hello", "world", " "]);
    }
}
