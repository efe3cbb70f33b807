use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One node of a page document dump
///
/// This is the nested wire format the page context is built from: a JSON tree
/// produced by whatever captured the inspected page (an injected extraction
/// script, a fixture file, a test builder). Geometry and visibility are
/// captured at dump time; the document never re-layouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSnapshot {
    /// HTML tag name, lowercase (e.g. "div", "span", "button")
    pub tag: String,

    /// Element attributes in source order
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Direct text content of this node (not including descendants)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Whether the element is rendered (hidden subtrees contribute no visible text)
    #[serde(default = "default_visible")]
    pub visible: bool,

    /// Viewport-relative bounding box at capture time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,

    /// Child elements in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

fn default_visible() -> bool {
    true
}

impl NodeSnapshot {
    /// Create a new NodeSnapshot with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
            text: None,
            visible: true,
            bounds: None,
            children: Vec::new(),
        }
    }

    /// Builder method: set an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder method: set direct text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder method: set visibility
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Builder method: set the bounding box
    pub fn with_bounds(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounds = Some(BoundingBox { x, y, width, height });
        self
    }

    /// Builder method: append a child node
    pub fn with_child(mut self, child: NodeSnapshot) -> Self {
        self.children.push(child);
        self
    }

    /// Get attribute value by key
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Check if this node is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

/// Bounding box coordinates for an element, viewport-relative
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box has non-zero dimensions
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Calculate the area of the bounding box
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Check if a viewport point falls inside this box
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_snapshot_builder() {
        let node = NodeSnapshot::new("BUTTON")
            .with_attr("id", "submit")
            .with_attr("class", "btn primary")
            .with_text("Send")
            .with_bounds(10.0, 20.0, 80.0, 30.0);

        assert_eq!(node.tag, "button");
        assert_eq!(node.attr("id"), Some("submit"));
        assert_eq!(node.attr("class"), Some("btn primary"));
        assert_eq!(node.text.as_deref(), Some("Send"));
        assert!(node.visible);
        assert!(node.bounds.unwrap().contains(50.0, 25.0));
    }

    #[test]
    fn test_visible_defaults_true_on_deserialize() {
        let node: NodeSnapshot = serde_json::from_str(r#"{"tag": "div"}"#).unwrap();
        assert!(node.visible);
        assert!(node.children.is_empty());
        assert!(node.bounds.is_none());
    }

    #[test]
    fn test_attribute_order_preserved() {
        let node = NodeSnapshot::new("img")
            .with_attr("src", "/a.png")
            .with_attr("alt", "a")
            .with_attr("title", "b");

        let keys: Vec<_> = node.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["src", "alt", "title"]);
    }

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox::new(10.0, 10.0, 100.0, 50.0);
        assert!(bbox.contains(10.0, 10.0));
        assert!(bbox.contains(109.9, 59.9));
        assert!(!bbox.contains(110.0, 30.0));
        assert!(!bbox.contains(9.9, 30.0));
        assert_eq!(bbox.area(), 5000.0);
    }

    #[test]
    fn test_zero_size_box_not_visible() {
        assert!(!BoundingBox::new(5.0, 5.0, 0.0, 0.0).is_visible());
        assert!(BoundingBox::new(5.0, 5.0, 1.0, 1.0).is_visible());
    }

    #[test]
    fn test_round_trip_serialization() {
        let node = NodeSnapshot::new("a")
            .with_attr("href", "/page")
            .with_child(NodeSnapshot::new("span").with_text("Go"));

        let json = serde_json::to_string(&node).unwrap();
        let back: NodeSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
