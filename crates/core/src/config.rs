//! Overlay configuration
//!
//! Every heuristic constant of the text layer (space-filter ratio, baseline
//! offset, large-text threshold, stretch clamp) is a named, overridable value
//! here. Configuration can be loaded from a TOML file, environment variables,
//! or created programmatically.

use crate::error::ConfigError;
use crate::overlay::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const MB: u64 = 1024 * 1024;

/// Configuration for text-layer derivation and annotation rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Minimum width / font-size ratio for a lone space run to be kept
    pub min_space_ratio: f32,

    /// Fraction of the em box above the baseline
    pub baseline_ratio: f32,

    /// Raw PDF font size above which text counts as large
    pub large_text_threshold: f32,

    /// Fraction of the container width used as the render target width
    pub container_margin: f32,

    /// Quiet period after the last resize before re-deriving
    pub resize_debounce_ms: u64,

    /// Lower clamp of the horizontal stretch factor
    pub min_stretch: f32,

    /// Upper clamp of the horizontal stretch factor
    pub max_stretch: f32,

    /// Largest accepted source file in bytes
    pub max_source_bytes: u64,

    /// Background applied by the highlight-bold rule
    pub bold_highlight: Color,

    /// Background applied by the highlight-italic rule
    pub italic_highlight: Color,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_space_ratio: 2.0,
            baseline_ratio: 0.8,
            large_text_threshold: 14.0,
            container_margin: 0.98,
            resize_debounce_ms: 500,
            min_stretch: 0.25,
            max_stretch: 4.0,
            max_source_bytes: 50 * MB,
            bold_highlight: Color::YELLOW_HIGHLIGHT,
            italic_highlight: Color::BLUE_HIGHLIGHT,
        }
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.trim().is_empty() => {
            log::warn!("ignoring empty environment override {key}");
            Ok(None)
        }
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(None),
    }
}

impl OverlayConfig {
    pub fn with_min_space_ratio(mut self, ratio: f32) -> Self {
        self.min_space_ratio = ratio;
        self
    }

    pub fn with_baseline_ratio(mut self, ratio: f32) -> Self {
        self.baseline_ratio = ratio;
        self
    }

    pub fn with_large_text_threshold(mut self, threshold: f32) -> Self {
        self.large_text_threshold = threshold;
        self
    }

    pub fn with_container_margin(mut self, margin: f32) -> Self {
        self.container_margin = margin;
        self
    }

    pub fn with_resize_debounce(mut self, window: Duration) -> Self {
        self.resize_debounce_ms = window.as_millis() as u64;
        self
    }

    pub fn with_stretch_range(mut self, min: f32, max: f32) -> Self {
        self.min_stretch = min;
        self.max_stretch = max;
        self
    }

    /// Sets the largest accepted source file in megabytes.
    pub fn with_max_source_mb(mut self, mb: u64) -> Self {
        self.max_source_bytes = mb * MB;
        self
    }

    pub fn with_bold_highlight(mut self, color: Color) -> Self {
        self.bold_highlight = color;
        self
    }

    pub fn with_italic_highlight(mut self, color: Color) -> Self {
        self.italic_highlight = color;
        self
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Returns the source size limit in megabytes.
    pub fn max_source_mb(&self) -> u64 {
        self.max_source_bytes / MB
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `PDF_OVERLAY_MIN_SPACE_RATIO` (default: 2.0)
    /// - `PDF_OVERLAY_BASELINE_RATIO` (default: 0.8)
    /// - `PDF_OVERLAY_LARGE_TEXT_THRESHOLD` (default: 14)
    /// - `PDF_OVERLAY_CONTAINER_MARGIN` (default: 0.98)
    /// - `PDF_OVERLAY_RESIZE_DEBOUNCE_MS` (default: 500)
    /// - `PDF_OVERLAY_MIN_STRETCH` / `PDF_OVERLAY_MAX_STRETCH` (default: 0.25 / 4.0)
    /// - `PDF_OVERLAY_MAX_SOURCE_MB` (default: 50)
    /// - `PDF_OVERLAY_BOLD_HIGHLIGHT` / `PDF_OVERLAY_ITALIC_HIGHLIGHT` as `#rrggbb[aa]`
    ///
    /// # Errors
    /// Returns an error if any variable holds an unparsable or out-of-range value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = env_value("PDF_OVERLAY_MIN_SPACE_RATIO")? {
            config.min_space_ratio = v;
        }
        if let Some(v) = env_value("PDF_OVERLAY_BASELINE_RATIO")? {
            config.baseline_ratio = v;
        }
        if let Some(v) = env_value("PDF_OVERLAY_LARGE_TEXT_THRESHOLD")? {
            config.large_text_threshold = v;
        }
        if let Some(v) = env_value("PDF_OVERLAY_CONTAINER_MARGIN")? {
            config.container_margin = v;
        }
        if let Some(v) = env_value("PDF_OVERLAY_RESIZE_DEBOUNCE_MS")? {
            config.resize_debounce_ms = v;
        }
        if let Some(v) = env_value("PDF_OVERLAY_MIN_STRETCH")? {
            config.min_stretch = v;
        }
        if let Some(v) = env_value("PDF_OVERLAY_MAX_STRETCH")? {
            config.max_stretch = v;
        }
        if let Some(mb) = env_value::<u64>("PDF_OVERLAY_MAX_SOURCE_MB")? {
            config.max_source_bytes = mb * MB;
        }
        if let Some(color) = env_value("PDF_OVERLAY_BOLD_HIGHLIGHT")? {
            config.bold_highlight = color;
        }
        if let Some(color) = env_value("PDF_OVERLAY_ITALIC_HIGHLIGHT")? {
            config.italic_highlight = color;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format (every key optional):
    /// ```toml
    /// min_space_ratio = 2.0
    /// large_text_threshold = 14.0
    /// resize_debounce_ms = 500
    ///
    /// [bold_highlight]
    /// r = 255
    /// g = 235
    /// b = 59
    /// a = 128
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string; missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Checks that every value is within its usable range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str| Err(ConfigError::InvalidValue(key.to_string()));

        if !self.min_space_ratio.is_finite() || self.min_space_ratio < 0.0 {
            return invalid("min_space_ratio");
        }
        if !(0.0..=1.0).contains(&self.baseline_ratio) {
            return invalid("baseline_ratio");
        }
        if !self.large_text_threshold.is_finite() || self.large_text_threshold < 0.0 {
            return invalid("large_text_threshold");
        }
        if !(self.container_margin > 0.0 && self.container_margin <= 1.0) {
            return invalid("container_margin");
        }
        if !(self.min_stretch.is_finite() && self.min_stretch > 0.0) {
            return invalid("min_stretch");
        }
        if !self.max_stretch.is_finite() || self.max_stretch < self.min_stretch {
            return invalid("max_stretch");
        }
        if self.max_source_bytes == 0 {
            return invalid("max_source_bytes");
        }
        Ok(())
    }
}
