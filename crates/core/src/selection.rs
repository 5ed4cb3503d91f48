//! Drag selection over the overlay and copy of the selected text

use crate::overlay::{OverlayLayer, OverlayNode};
use serde::{Deserialize, Serialize};

/// Selection rectangle in overlay pixels
///
/// The anchor stays where the drag started; the rectangle is kept normalized
/// (left <= right, top <= bottom) as the drag point moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    anchor: (f32, f32),
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl SelectionRect {
    /// Start a drag at `(x, y)`
    pub fn start(x: f32, y: f32) -> Self {
        Self { anchor: (x, y), left: x, top: y, right: x, bottom: y }
    }

    pub fn from_points(start: (f32, f32), end: (f32, f32)) -> Self {
        let mut rect = Self::start(start.0, start.1);
        rect.update(end.0, end.1);
        rect
    }

    /// Move the drag point and renormalize
    pub fn update(&mut self, x: f32, y: f32) {
        let (ax, ay) = self.anchor;
        self.left = ax.min(x);
        self.right = ax.max(x);
        self.top = ay.min(y);
        self.bottom = ay.max(y);
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Whether the rectangle has less than a pixel of area in either direction
    pub fn is_empty(&self) -> bool {
        self.width() < 1.0 || self.height() < 1.0
    }

    pub fn intersects(&self, node: &OverlayNode) -> bool {
        !(node.right_px() < self.left
            || self.right < node.left_px
            || node.bottom_px() < self.top
            || self.bottom < node.top_px)
    }
}

impl OverlayLayer {
    /// Mark every node intersecting `rect` as selected
    ///
    /// Returns the number of nodes newly selected. An empty rectangle selects
    /// nothing.
    pub fn select_in_rect(&mut self, rect: &SelectionRect) -> usize {
        if rect.is_empty() {
            return 0;
        }
        self.restyle(
            |node| rect.intersects(node),
            |style| style.selected = true,
        )
    }

    pub fn clear_selection(&mut self) {
        self.restyle(|_| true, |style| style.selected = false);
    }

    pub fn selected_count(&self) -> usize {
        self.styles().iter().filter(|s| s.selected).count()
    }

    /// Selected node text in layer order
    ///
    /// Nodes whose top differs from the previous selected node by more than
    /// half a font size start a new line; others are joined by a space unless
    /// either side already carries whitespace.
    pub fn selected_text(&self) -> String {
        let mut out = String::new();
        let mut previous: Option<&OverlayNode> = None;

        for (_, node, style) in self.iter() {
            if !style.selected {
                continue;
            }
            if let Some(prev) = previous {
                if (node.top_px - prev.top_px).abs() > node.font_size_px / 2.0 {
                    out.push('\n');
                } else if !prev.text.ends_with(char::is_whitespace)
                    && !node.text.starts_with(char::is_whitespace)
                {
                    out.push(' ');
                }
            }
            out.push_str(&node.text);
            previous = Some(node);
        }

        out
    }
}
