//! Visual decoration records produced by the picker
//!
//! Overlays are plain data: a UI surface renders them, the engine only
//! decides where they sit and how they look. Depth tiers map to border
//! styles so the hovered element, its parent, and further ancestors are
//! distinguishable at a glance.

use crate::dom::BoundingBox;
use serde::{Deserialize, Serialize};

/// Z-order of the hovered element's overlay; deeper ancestors stack below
pub const OVERLAY_BASE_Z: i32 = 999_999;

/// Z-order of the full-viewport overlay container
pub const OVERLAY_CONTAINER_Z: i32 = 999_998;

/// Z-order of the instruction tooltip, above every hover overlay
pub const TOOLTIP_Z: i32 = 1_000_000;

/// Z-order of the persistent selection border (maximum stacking order)
pub const SELECTION_BORDER_Z: i32 = i32::MAX;

/// Border treatment per depth tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    Solid,
    Dashed,
    Dotted,
}

/// Visual treatment of one overlay rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub border_width: f64,
    pub border: BorderStyle,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<String>,
}

impl OverlayStyle {
    fn new(border_width: f64, border: BorderStyle, color: &str, fill: Option<&str>) -> Self {
        Self {
            border_width,
            border,
            color: color.to_string(),
            fill: fill.map(str::to_string),
            shadow: None,
        }
    }
}

/// Styling for the hover hierarchy and the persistent selection border
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayTheme {
    /// Depth 0: the hovered element itself
    pub current: OverlayStyle,
    /// Depth 1: its parent
    pub parent: OverlayStyle,
    /// Depth 2 and beyond
    pub ancestor: OverlayStyle,
    /// The border left behind after a successful pick
    pub selection: OverlayStyle,
}

impl Default for OverlayTheme {
    fn default() -> Self {
        Self {
            current: OverlayStyle::new(3.0, BorderStyle::Solid, "#1b5e20", Some("rgba(27, 94, 32, 0.1)")),
            parent: OverlayStyle::new(3.0, BorderStyle::Dashed, "#2d5016", Some("rgba(45, 80, 22, 0.05)")),
            ancestor: OverlayStyle::new(2.0, BorderStyle::Dotted, "#1b5e20", None),
            selection: OverlayStyle {
                border_width: 4.0,
                border: BorderStyle::Solid,
                color: "#28a745".to_string(),
                fill: Some("rgba(40, 167, 69, 0.15)".to_string()),
                shadow: Some("0 0 10px rgba(40, 167, 69, 0.8)".to_string()),
            },
        }
    }
}

impl OverlayTheme {
    /// Style for a hover overlay at the given ancestor depth
    pub fn depth_style(&self, depth: usize) -> &OverlayStyle {
        match depth {
            0 => &self.current,
            1 => &self.parent,
            _ => &self.ancestor,
        }
    }
}

/// One hover overlay rectangle, mirroring an ancestor's bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightOverlay {
    /// Viewport-relative rectangle
    pub rect: BoundingBox,
    /// 0 = hovered element, 1 = parent, 2+ = further ancestors
    pub depth: usize,
    pub style: OverlayStyle,
    pub z_index: i32,
}

/// The overlay container's contents, rebuilt from scratch on every pointer move
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayScene {
    overlays: Vec<HighlightOverlay>,
}

impl OverlayScene {
    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn push(&mut self, overlay: HighlightOverlay) {
        self.overlays.push(overlay);
    }

    pub fn overlays(&self) -> &[HighlightOverlay] {
        &self.overlays
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }
}

/// Default instruction text shown while selection mode is active
pub const TOOLTIP_TEXT: &str = "Hover to highlight \u{2022} Click to select \u{2022} Esc to cancel";

/// The fixed instruction tooltip shown during selection mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub text: String,
    /// Fixed viewport-relative placement; pointer hits inside it are ignored
    pub rect: BoundingBox,
    pub z_index: i32,
}

impl Default for Tooltip {
    fn default() -> Self {
        Self {
            text: TOOLTIP_TEXT.to_string(),
            rect: BoundingBox::new(20.0, 20.0, 320.0, 44.0),
            z_index: TOOLTIP_Z,
        }
    }
}

/// The persistent border left on the picked element after selection mode ends
///
/// Positioned in document coordinates (viewport rect plus scroll offset) so
/// it stays glued to the element when the page scrolls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionBorder {
    pub rect: BoundingBox,
    pub style: OverlayStyle,
    pub z_index: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_tier_styles() {
        let theme = OverlayTheme::default();
        assert_eq!(theme.depth_style(0).border, BorderStyle::Solid);
        assert_eq!(theme.depth_style(1).border, BorderStyle::Dashed);
        assert_eq!(theme.depth_style(2).border, BorderStyle::Dotted);
        assert_eq!(theme.depth_style(7).border, BorderStyle::Dotted);
    }

    #[test]
    fn test_depth_fills() {
        let theme = OverlayTheme::default();
        assert!(theme.depth_style(0).fill.is_some());
        assert!(theme.depth_style(1).fill.is_some());
        assert!(theme.depth_style(2).fill.is_none());
    }

    #[test]
    fn test_scene_rebuild() {
        let theme = OverlayTheme::default();
        let mut scene = OverlayScene::default();
        scene.push(HighlightOverlay {
            rect: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            depth: 0,
            style: theme.depth_style(0).clone(),
            z_index: OVERLAY_BASE_Z,
        });
        assert_eq!(scene.len(), 1);
        scene.clear();
        assert!(scene.is_empty());
    }

    #[test]
    fn test_z_order_constants() {
        assert!(TOOLTIP_Z > OVERLAY_BASE_Z);
        assert!(OVERLAY_BASE_Z > OVERLAY_CONTAINER_Z);
        assert_eq!(SELECTION_BORDER_Z, 2_147_483_647);
    }
}
