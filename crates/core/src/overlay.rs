//! Overlay nodes and their presentation state
//!
//! An [`OverlayLayer`] is an arena of [`OverlayNode`]s (geometry and font
//! attributes, shared and immutable) plus one [`NodeStyle`] per node
//! (presentation, owned and mutable). Rules and selection only ever touch the
//! styles, so geometry can never drift from the raster it was derived with.

use crate::annotation::FontPanel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const YELLOW_HIGHLIGHT: Color = Color { r: 255, g: 235, b: 59, a: 128 };
    pub const BLUE_HIGHLIGHT: Color = Color { r: 144, g: 202, b: 249, a: 128 };
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// Parses `#rrggbb` or `#rrggbbaa` (the leading `#` is optional)
impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
            return Err(format!("expected #rrggbb or #rrggbbaa, got {s:?}"));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid hex color {s:?}"))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color::new(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
}

/// Stable index of a node within one overlay layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One positioned, invisible-but-selectable text element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayNode {
    pub text: String,

    /// Left edge in overlay pixels
    pub left_px: f32,

    /// Top edge of the em box in overlay pixels
    pub top_px: f32,

    pub font_size_px: f32,

    /// Declared advance width in overlay pixels
    pub width_px: f32,

    /// Horizontal stretch that fits the measured text to `width_px`
    pub scale_x: f32,

    pub bold: bool,
    pub italic: bool,

    /// Font size in PDF units, before scaling
    pub raw_font_size: f32,

    pub font_name: String,
}

impl OverlayNode {
    pub fn right_px(&self) -> f32 {
        self.left_px + self.width_px
    }

    pub fn bottom_px(&self) -> f32 {
        self.top_px + self.font_size_px
    }
}

/// Presentation overrides of one node
///
/// `NodeStyle::default()` is the unstyled baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStyle {
    pub background: Option<Color>,
    pub decoration: TextDecoration,
    pub selected: bool,
}

impl NodeStyle {
    pub fn is_baseline(&self) -> bool {
        *self == NodeStyle::default()
    }
}

#[derive(Serialize)]
struct StyledNode<'a> {
    id: NodeId,
    #[serde(flatten)]
    node: &'a OverlayNode,
    style: &'a NodeStyle,
}

/// Overlay nodes of one published derivation with their presentation state
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    generation: u64,
    nodes: Arc<[OverlayNode]>,
    styles: Vec<NodeStyle>,
    pub(crate) panel: Option<FontPanel>,
}

impl OverlayLayer {
    pub fn new(generation: u64, nodes: Arc<[OverlayNode]>) -> Self {
        let styles = vec![NodeStyle::default(); nodes.len()];
        Self { generation, nodes, styles, panel: None }
    }

    pub fn empty() -> Self {
        Self::new(0, Arc::from(Vec::new()))
    }

    /// Generation of the derivation these nodes came from (0 when empty)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[OverlayNode] {
        &self.nodes
    }

    pub fn styles(&self) -> &[NodeStyle] {
        &self.styles
    }

    pub fn node(&self, id: NodeId) -> Option<&OverlayNode> {
        self.nodes.get(id.0)
    }

    pub fn style(&self, id: NodeId) -> Option<&NodeStyle> {
        self.styles.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &OverlayNode, &NodeStyle)> {
        self.nodes
            .iter()
            .zip(self.styles.iter())
            .enumerate()
            .map(|(i, (node, style))| (NodeId(i), node, style))
    }

    /// Font panel opened by the select-font rule
    pub fn panel(&self) -> Option<&FontPanel> {
        self.panel.as_ref()
    }

    /// Whether every node is at its baseline style and no panel is open
    pub fn is_unstyled(&self) -> bool {
        self.panel.is_none() && self.styles.iter().all(NodeStyle::is_baseline)
    }

    /// Apply `update` to the style of every node matching `predicate`
    ///
    /// Returns the number of nodes touched.
    pub(crate) fn restyle(
        &mut self,
        predicate: impl Fn(&OverlayNode) -> bool,
        update: impl Fn(&mut NodeStyle),
    ) -> usize {
        let mut touched = 0;
        for (node, style) in self.nodes.iter().zip(self.styles.iter_mut()) {
            if predicate(node) {
                update(style);
                touched += 1;
            }
        }
        touched
    }

    /// Return every node to its baseline style and close the panel
    pub(crate) fn reset_styles(&mut self) {
        self.styles.fill(NodeStyle::default());
        self.panel = None;
    }

    /// Nodes with their styles as JSON, for hand-off to a rendering host
    pub fn to_json(&self) -> serde_json::Result<String> {
        let nodes: Vec<StyledNode<'_>> = self
            .iter()
            .map(|(id, node, style)| StyledNode { id, node, style })
            .collect();
        serde_json::to_string(&nodes)
    }
}

impl Default for OverlayLayer {
    fn default() -> Self {
        Self::empty()
    }
}
