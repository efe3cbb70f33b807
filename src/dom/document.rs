use crate::dom::node::{BoundingBox, NodeSnapshot};
use crate::error::{PickError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Index of a node inside a [`PageDocument`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

/// Opaque reference to a live element of one [`PageDocument`]
///
/// Handles are only valid for the document that produced them and are
/// deliberately not serializable: the only way element data crosses a context
/// boundary is through [`crate::serialize::serialize_element`], which converts
/// a handle into a plain [`crate::serialize::ElementPayload`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveElementHandle {
    pub(crate) id: NodeId,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) tag: String,
    pub(crate) attributes: IndexMap<String, String>,
    pub(crate) text: Option<String>,
    pub(crate) visible: bool,
    pub(crate) bounds: Option<BoundingBox>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Document load progress, mirrored from the inspected page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Serialized form of a whole captured page: metadata plus the node tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDump {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    pub root: NodeSnapshot,
}

/// In-memory model of the inspected page
///
/// Built once from a [`DocumentDump`]; geometry and visibility are frozen at
/// capture time. The arena is append-only, so node ids stay valid for the
/// lifetime of the document.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub(crate) nodes: Vec<NodeData>,
    root: NodeId,
    body: Option<NodeId>,
    title: String,
    url: String,
    scroll: (f64, f64),
    ready_state: ReadyState,
}

impl PageDocument {
    /// Parse a JSON document dump into a page document
    pub fn from_json(json: &str) -> Result<Self> {
        let dump: DocumentDump = serde_json::from_str(json)
            .map_err(|e| PickError::DomParseFailed(format!("Failed to parse document dump: {}", e)))?;
        Ok(Self::from_dump(dump))
    }

    /// Build a page document from an already-parsed dump
    pub fn from_dump(dump: DocumentDump) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: None,
            title: dump.title,
            url: dump.url,
            scroll: (dump.scroll_x, dump.scroll_y),
            ready_state: ReadyState::Complete,
        };
        let root = doc.insert(&dump.root, None);
        doc.root = root;
        doc.body = doc.find_tag(root, "body");
        doc
    }

    /// Build a page document from a bare node tree with the given metadata
    pub fn from_snapshot(title: impl Into<String>, url: impl Into<String>, root: NodeSnapshot) -> Self {
        Self::from_dump(DocumentDump {
            title: title.into(),
            url: url.into(),
            scroll_x: 0.0,
            scroll_y: 0.0,
            root,
        })
    }

    fn insert(&mut self, snapshot: &NodeSnapshot, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: snapshot.tag.to_ascii_lowercase(),
            attributes: snapshot.attributes.clone(),
            text: snapshot.text.clone(),
            visible: snapshot.visible,
            bounds: snapshot.bounds,
            parent,
            children: Vec::new(),
        });
        for child in &snapshot.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    fn find_tag(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        if self.nodes[from.0].tag == tag {
            return Some(from);
        }
        for &child in &self.nodes[from.0].children {
            if let Some(found) = self.find_tag(child, tag) {
                return Some(found);
            }
        }
        None
    }

    pub(crate) fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    /// Handle to the document root element
    pub fn root(&self) -> LiveElementHandle {
        LiveElementHandle { id: self.root }
    }

    /// Handle to the `<body>` element, if the dump contains one
    pub fn body(&self) -> Option<LiveElementHandle> {
        self.body.map(|id| LiveElementHandle { id })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current scroll offset `(x, y)` of the page
    pub fn scroll_offset(&self) -> (f64, f64) {
        self.scroll
    }

    pub fn set_scroll_offset(&mut self, x: f64, y: f64) {
        self.scroll = (x, y);
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    /// Lowercase tag name of an element ("" for a foreign handle)
    pub fn tag(&self, handle: LiveElementHandle) -> &str {
        self.data(handle.id).map(|n| n.tag.as_str()).unwrap_or("")
    }

    /// Attribute value of an element
    pub fn attr(&self, handle: LiveElementHandle, key: &str) -> Option<&str> {
        self.data(handle.id)?.attributes.get(key).map(String::as_str)
    }

    /// The element's `id` attribute, if present and non-empty
    pub fn id_attr(&self, handle: LiveElementHandle) -> Option<&str> {
        self.attr(handle, "id").filter(|v| !v.is_empty())
    }

    /// Viewport-relative bounding box at capture time
    pub fn bounds(&self, handle: LiveElementHandle) -> Option<BoundingBox> {
        self.data(handle.id)?.bounds
    }

    pub fn is_visible(&self, handle: LiveElementHandle) -> bool {
        self.data(handle.id).map(|n| n.visible).unwrap_or(false)
    }

    pub fn parent(&self, handle: LiveElementHandle) -> Option<LiveElementHandle> {
        self.data(handle.id)?.parent.map(|id| LiveElementHandle { id })
    }

    /// Direct child elements, in document order
    pub fn children(&self, handle: LiveElementHandle) -> Vec<LiveElementHandle> {
        self.data(handle.id)
            .map(|n| n.children.iter().map(|&id| LiveElementHandle { id }).collect())
            .unwrap_or_default()
    }

    /// Number of direct child elements
    pub fn child_element_count(&self, handle: LiveElementHandle) -> usize {
        self.data(handle.id).map(|n| n.children.len()).unwrap_or(0)
    }

    /// Total number of elements in the document
    pub fn count_elements(&self) -> usize {
        self.nodes.len()
    }

    /// Topmost element under a viewport point
    ///
    /// Resolves the deepest visible node whose bounding box contains the point,
    /// with later siblings painting over earlier ones.
    pub fn element_from_point(&self, x: f64, y: f64) -> Option<LiveElementHandle> {
        self.hit(self.root, x, y).map(|id| LiveElementHandle { id })
    }

    fn hit(&self, id: NodeId, x: f64, y: f64) -> Option<NodeId> {
        let node = &self.nodes[id.0];
        if !node.visible {
            return None;
        }
        for &child in node.children.iter().rev() {
            if let Some(found) = self.hit(child, x, y) {
                return Some(found);
            }
        }
        match node.bounds {
            Some(b) if b.contains(x, y) => Some(id),
            _ => None,
        }
    }

    /// Ancestor chain of an element, nearest first, ending at the root
    pub fn ancestors(&self, handle: LiveElementHandle) -> Vec<LiveElementHandle> {
        let mut chain = Vec::new();
        let mut current = self.parent(handle);
        while let Some(ancestor) = current {
            chain.push(ancestor);
            current = self.parent(ancestor);
        }
        chain
    }

    /// Hierarchy used for highlight overlays: the element itself followed by
    /// its ancestors, nearest first, up to but excluding `<body>` and `<html>`
    pub fn hierarchy_from(&self, handle: LiveElementHandle) -> Vec<LiveElementHandle> {
        let mut chain = Vec::new();
        let mut current = Some(handle);
        while let Some(el) = current {
            let tag = self.tag(el);
            if tag == "body" || tag == "html" {
                break;
            }
            chain.push(el);
            current = self.parent(el);
        }
        chain
    }

    /// 1-based position of an element among preceding same-tag siblings
    ///
    /// Sibling counting compares only the tag name, never classes.
    pub fn nth_of_type_position(&self, handle: LiveElementHandle) -> usize {
        let Some(parent) = self.parent(handle) else {
            return 1;
        };
        let tag = self.tag(handle);
        let mut nth = 1;
        for sibling in self.children(parent) {
            if sibling == handle {
                break;
            }
            if self.tag(sibling) == tag {
                nth += 1;
            }
        }
        nth
    }

    /// Serialized HTML of an element and all its descendants
    pub fn outer_html(&self, handle: LiveElementHandle) -> String {
        let mut out = String::new();
        if self.data(handle.id).is_some() {
            self.write_html(handle.id, &mut out);
        }
        out
    }

    /// Serialized HTML of the whole document
    pub fn full_html(&self) -> String {
        self.outer_html(self.root())
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        out.push('<');
        out.push_str(&node.tag);
        for (key, value) in &node.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_attr(value, out);
            out.push('"');
        }
        out.push('>');
        if is_void_tag(&node.tag) {
            return;
        }
        if let Some(text) = &node.text {
            escape_text(text, out);
        }
        for &child in &node.children {
            self.write_html(child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }

    /// Rendered text of an element: the trimmed text of its visible subtree
    ///
    /// Hidden nodes contribute nothing, matching what a rendering engine would
    /// expose as visible text rather than raw text content.
    pub fn visible_text(&self, handle: LiveElementHandle) -> String {
        let mut parts = Vec::new();
        if self.data(handle.id).is_some() {
            self.collect_visible_text(handle.id, &mut parts);
        }
        parts.join(" ")
    }

    fn collect_visible_text(&self, id: NodeId, parts: &mut Vec<String>) {
        let node = &self.nodes[id.0];
        if !node.visible {
            return;
        }
        if let Some(text) = &node.text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        for &child in &node.children {
            self.collect_visible_text(child, parts);
        }
    }
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta"
            | "source" | "track" | "wbr"
    )
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
}
