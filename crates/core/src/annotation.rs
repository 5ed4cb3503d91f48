//! Annotation rules over the overlay
//!
//! A rule queries nodes by attribute and restyles them. [`RuleEngine`] keeps
//! at most one rule active:
//!
//! - `activate(r)` while inactive applies `r`
//! - `activate(r)` while `r` is active removes it (toggle off)
//! - `activate(r2)` while `r1` is active removes `r1`, then applies `r2`
//!
//! Removal is a full reset of every node's presentation, not an undo of the
//! nodes the rule touched.

use crate::builder::PublishedLayer;
use crate::config::OverlayConfig;
use crate::overlay::{Color, OverlayLayer, OverlayNode, TextDecoration};
use crate::selection::SelectionRect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationRule {
    HighlightBold,
    HighlightItalic,
    UnderlineLarge,
    SelectFont,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown annotation rule: {0}")]
pub struct UnknownRule(pub String);

/// Colors and thresholds the rules apply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulePalette {
    pub bold_highlight: Color,
    pub italic_highlight: Color,
    pub large_text_threshold: f32,
}

impl RulePalette {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            bold_highlight: config.bold_highlight,
            italic_highlight: config.italic_highlight,
            large_text_threshold: config.large_text_threshold,
        }
    }
}

impl Default for RulePalette {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

impl AnnotationRule {
    pub const ALL: [AnnotationRule; 4] = [
        AnnotationRule::HighlightBold,
        AnnotationRule::HighlightItalic,
        AnnotationRule::UnderlineLarge,
        AnnotationRule::SelectFont,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnnotationRule::HighlightBold => "highlight-bold",
            AnnotationRule::HighlightItalic => "highlight-italic",
            AnnotationRule::UnderlineLarge => "underline-large",
            AnnotationRule::SelectFont => "select-font",
        }
    }

    /// Restyle the nodes this rule targets; returns how many were touched
    ///
    /// Idempotent. `SelectFont` styles nothing and opens the font panel.
    pub fn apply(self, layer: &mut OverlayLayer, palette: &RulePalette) -> usize {
        let touched = match self {
            AnnotationRule::HighlightBold => {
                let color = palette.bold_highlight;
                layer.restyle(|n| n.bold, |s| s.background = Some(color))
            }
            AnnotationRule::HighlightItalic => {
                let color = palette.italic_highlight;
                layer.restyle(|n| n.italic, |s| s.background = Some(color))
            }
            AnnotationRule::UnderlineLarge => {
                let threshold = palette.large_text_threshold;
                layer.restyle(
                    |n| n.raw_font_size > threshold,
                    |s| s.decoration = TextDecoration::Underline,
                )
            }
            AnnotationRule::SelectFont => {
                layer.panel = Some(FontPanel::from_nodes(layer.nodes()));
                0
            }
        };
        log::debug!("{self} applied to {touched} node(s)");
        touched
    }

    /// Return every node to the unstyled baseline
    pub fn remove(self, layer: &mut OverlayLayer) {
        layer.reset_styles();
        log::debug!("{self} removed");
    }
}

impl fmt::Display for AnnotationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AnnotationRule {
    type Err = UnknownRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationRule::ALL
            .into_iter()
            .find(|rule| rule.name() == s)
            .ok_or_else(|| UnknownRule(s.to_string()))
    }
}

/// One font listed in the font panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontEntry {
    pub name: String,
    pub node_count: usize,
    pub bold: bool,
    pub italic: bool,
}

/// Font-based selection panel opened by the select-font rule
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FontPanel {
    pub entries: Vec<FontEntry>,
    pub selected: Option<String>,
}

impl FontPanel {
    /// Distinct fonts of `nodes`, sorted by name
    pub fn from_nodes(nodes: &[OverlayNode]) -> Self {
        let mut fonts: BTreeMap<&str, FontEntry> = BTreeMap::new();
        for node in nodes {
            fonts
                .entry(node.font_name.as_str())
                .or_insert_with(|| FontEntry {
                    name: node.font_name.clone(),
                    node_count: 0,
                    bold: node.bold,
                    italic: node.italic,
                })
                .node_count += 1;
        }
        Self { entries: fonts.into_values().collect(), selected: None }
    }

    pub fn entry(&self, name: &str) -> Option<&FontEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleState {
    #[default]
    Inactive,
    Active(AnnotationRule),
}

/// Owns the current overlay layer and the single active rule
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    palette: RulePalette,
    state: RuleState,
    layer: OverlayLayer,
}

impl RuleEngine {
    pub fn new(palette: RulePalette) -> Self {
        Self { palette, state: RuleState::Inactive, layer: OverlayLayer::empty() }
    }

    pub fn from_config(config: &OverlayConfig) -> Self {
        Self::new(RulePalette::from_config(config))
    }

    pub fn state(&self) -> RuleState {
        self.state
    }

    pub fn layer(&self) -> &OverlayLayer {
        &self.layer
    }

    pub fn activate(&mut self, rule: AnnotationRule) -> RuleState {
        self.state = match self.state {
            RuleState::Inactive => {
                rule.apply(&mut self.layer, &self.palette);
                RuleState::Active(rule)
            }
            RuleState::Active(current) if current == rule => {
                rule.remove(&mut self.layer);
                RuleState::Inactive
            }
            RuleState::Active(current) => {
                current.remove(&mut self.layer);
                rule.apply(&mut self.layer, &self.palette);
                RuleState::Active(rule)
            }
        };
        self.state
    }

    pub fn deactivate(&mut self) {
        if let RuleState::Active(current) = self.state {
            current.remove(&mut self.layer);
            self.state = RuleState::Inactive;
        }
    }

    /// Select every node drawn in font `name`
    ///
    /// Only while the font panel is open; replaces the previous selection.
    /// Returns the number of nodes selected.
    pub fn select_font(&mut self, name: &str) -> usize {
        if self.layer.panel.is_none() {
            return 0;
        }
        self.layer.clear_selection();
        let count = self.layer.restyle(|n| n.font_name == name, |s| s.selected = true);
        if let Some(panel) = self.layer.panel.as_mut() {
            panel.selected = Some(name.to_string());
        }
        count
    }

    pub fn select_in_rect(&mut self, rect: &SelectionRect) -> usize {
        self.layer.select_in_rect(rect)
    }

    pub fn clear_selection(&mut self) {
        self.layer.clear_selection();
    }

    pub fn selected_text(&self) -> String {
        self.layer.selected_text()
    }

    /// Attach to a freshly published layer
    ///
    /// The old nodes are discarded with their styles; the active rule (and a
    /// font chosen in the panel) is reapplied to the new nodes.
    pub fn rebind(&mut self, published: &PublishedLayer) {
        let chosen_font = self.layer.panel.as_ref().and_then(|p| p.selected.clone());
        self.layer = OverlayLayer::new(published.generation, published.nodes.clone());

        if let RuleState::Active(rule) = self.state {
            rule.apply(&mut self.layer, &self.palette);
            if let Some(font) = chosen_font {
                self.select_font(&font);
            }
        }
        log::debug!("rule engine bound to generation {}", published.generation);
    }
}
