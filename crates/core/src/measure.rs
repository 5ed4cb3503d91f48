//! Text measurement in the overlay's sans-serif face

use pdf_engine::metrics::sans_serif_advance;

/// Measures the rendered width of text at a pixel font size
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, font_size_px: f32) -> f32;
}

impl<F> TextMeasurer for F
where
    F: Fn(&str, f32) -> f32 + Send + Sync,
{
    fn measure(&self, text: &str, font_size_px: f32) -> f32 {
        self(text, font_size_px)
    }
}

/// Measures with Helvetica advance widths
///
/// Printable ASCII uses the AFM table; everything else the average
/// lowercase advance.
#[derive(Debug, Clone, Copy, Default)]
pub struct SansSerifMeasurer;

impl TextMeasurer for SansSerifMeasurer {
    fn measure(&self, text: &str, font_size_px: f32) -> f32 {
        if text.is_empty() || !font_size_px.is_finite() || font_size_px <= 0.0 {
            return 0.0;
        }
        let units: u32 = text.chars().map(|ch| u32::from(sans_serif_advance(ch))).sum();
        units as f32 / 1000.0 * font_size_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measures_ascii() {
        // H=722 i=222
        let width = SansSerifMeasurer.measure("Hi", 10.0);
        assert!((width - 9.44).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_inputs_measure_zero() {
        assert_eq!(SansSerifMeasurer.measure("", 12.0), 0.0);
        assert_eq!(SansSerifMeasurer.measure("text", 0.0), 0.0);
        assert_eq!(SansSerifMeasurer.measure("text", -3.0), 0.0);
        assert_eq!(SansSerifMeasurer.measure("text", f32::NAN), 0.0);
    }

    #[test]
    fn test_closure_measurer() {
        let fixed = |text: &str, size: f32| text.len() as f32 * size;
        assert_eq!(fixed.measure("abc", 2.0), 6.0);
    }
}
