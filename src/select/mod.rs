//! Selector/overlay engine
//!
//! Tracks pointer hover over the modeled page, renders the multi-level
//! highlight hierarchy (solid for the hovered element, dashed for its parent,
//! dotted beyond), finalizes a pick on click, and leaves a single persistent
//! selection border behind until highlights are explicitly cleared.

pub mod engine;
pub mod overlay;

pub use engine::{SelectionMode, SelectorEngine};
pub use overlay::{
    BorderStyle, HighlightOverlay, OverlayScene, OverlayStyle, OverlayTheme, SelectionBorder,
    Tooltip, OVERLAY_BASE_Z, OVERLAY_CONTAINER_Z, SELECTION_BORDER_Z, TOOLTIP_TEXT, TOOLTIP_Z,
};
