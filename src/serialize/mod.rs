//! Element serialization: live handle in, transport-safe payload out
//!
//! The single conversion point between the page context and everything else.
//! Given a [`LiveElementHandle`], produces a plain [`ElementPayload`] record
//! synchronously, with no storage or network access; persisting or shipping
//! the payload is the caller's job.

use crate::dom::{BoundingBox, LiveElementHandle, PageDocument};
use crate::error::{PickError, Result};
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Attributes worth carrying across the context boundary, in payload order
pub const ATTRIBUTE_ALLOWLIST: [&str; 11] = [
    "id",
    "class",
    "alt",
    "title",
    "aria-label",
    "src",
    "href",
    "data-testid",
    "name",
    "type",
    "placeholder",
];

/// Marker appended to HTML clipped at the configured cap
pub const TRUNCATION_MARKER: &str = "...";

/// Size limits applied while serializing an element
///
/// `html_cap` defaults to 50 000 characters, the limit of the in-page capture
/// path; [`CaptureOptions::compact`] gives the 10 000-character variant used
/// where payloads must stay small. Visible text is always capped without a
/// marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub html_cap: usize,
    pub text_cap: usize,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self { html_cap: 50_000, text_cap: 500 }
    }
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The small-payload variant (10 000-character HTML cap)
    pub fn compact() -> Self {
        Self { html_cap: 10_000, text_cap: 500 }
    }

    /// Builder method: override the HTML cap
    pub fn with_html_cap(mut self, cap: usize) -> Self {
        self.html_cap = cap;
        self
    }

    /// Builder method: override the visible-text cap
    pub fn with_text_cap(mut self, cap: usize) -> Self {
        self.text_cap = cap;
        self
    }
}

/// The serialized, size-bounded record of one picked element
///
/// The only element representation that crosses the inter-context boundary
/// or lands in the shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ElementPayload {
    /// Lowercase element tag
    #[serde(rename = "tagName")]
    pub tag_name: String,

    /// Trimmed rendered text, capped with no marker
    #[serde(rename = "visibleText")]
    pub visible_text: String,

    /// Allow-listed attributes present with a non-empty value
    pub attributes: IndexMap<String, String>,

    /// Serialized HTML of the element and descendants, capped with a marker
    #[serde(rename = "outerHTMLSnippet")]
    pub outer_html_snippet: String,

    /// Untruncated HTML length, so callers can detect clipping
    #[serde(rename = "fullHTMLSize")]
    pub full_html_size: usize,

    /// Direct child element count
    #[serde(rename = "childrenCount")]
    pub children_count: usize,

    /// Best-effort unique CSS selector for the element
    #[serde(rename = "robustSelector")]
    pub robust_selector: String,

    /// Viewport-relative geometry at capture time
    #[serde(rename = "boundingRect")]
    pub bounding_rect: BoundingBox,

    /// URL of the page the element was picked from
    #[serde(rename = "pageURL")]
    pub page_url: String,

    /// ISO-8601 capture time
    pub timestamp: String,
}

/// Serialize a live element into a transport-safe payload
pub fn serialize_element(
    doc: &PageDocument,
    handle: LiveElementHandle,
    options: &CaptureOptions,
) -> Result<ElementPayload> {
    let tag_name = doc.tag(handle).to_string();
    if tag_name.is_empty() {
        return Err(PickError::ElementNotFound(
            "handle does not resolve in this document".to_string(),
        ));
    }

    let mut attributes = IndexMap::new();
    for attr in ATTRIBUTE_ALLOWLIST {
        if let Some(value) = doc.attr(handle, attr) {
            if !value.is_empty() {
                attributes.insert(attr.to_string(), value.to_string());
            }
        }
    }

    let visible_text = truncate_chars(doc.visible_text(handle).trim(), options.text_cap);

    let full_html = doc.outer_html(handle);
    let full_html_size = full_html.chars().count();
    let outer_html_snippet = if full_html_size > options.html_cap {
        let mut clipped = truncate_chars(&full_html, options.html_cap);
        clipped.push_str(TRUNCATION_MARKER);
        clipped
    } else {
        full_html
    };

    Ok(ElementPayload {
        tag_name,
        visible_text,
        attributes,
        outer_html_snippet,
        full_html_size,
        children_count: doc.child_element_count(handle),
        robust_selector: robust_selector(doc, handle),
        bounding_rect: doc.bounds(handle).unwrap_or_default(),
        page_url: doc.url().to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Compute a best-effort CSS selector for an element
///
/// Elements with an id get `#id` outright; otherwise the path is built
/// upward, one `tag[.class1[.class2]][:nth-of-type(n)]` segment per level,
/// until an ancestor with an id anchors it (or the root is reached). The
/// result is human-readable and usually unique, never guaranteed unique.
pub fn robust_selector(doc: &PageDocument, handle: LiveElementHandle) -> String {
    if let Some(id) = doc.id_attr(handle) {
        return format!("#{}", id);
    }

    let mut path = Vec::new();
    let mut current = Some(handle);
    while let Some(el) = current {
        if let Some(id) = doc.id_attr(el) {
            path.push(format!("#{}", id));
            break;
        }

        let mut segment = doc.tag(el).to_string();
        if let Some(class) = doc.attr(el, "class") {
            let classes: Vec<&str> = class.split(' ').filter(|c| !c.is_empty()).take(2).collect();
            if !classes.is_empty() {
                segment.push('.');
                segment.push_str(&classes.join("."));
            }
        }

        let nth = doc.nth_of_type_position(el);
        if nth > 1 {
            segment.push_str(&format!(":nth-of-type({})", nth));
        }

        path.push(segment);
        current = doc.parent(el);
    }

    path.reverse();
    path.join(" > ")
}

/// Cut a string at a character count, never splitting a code point
fn truncate_chars(s: &str, cap: usize) -> String {
    match s.char_indices().nth(cap) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
