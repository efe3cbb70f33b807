//! Matcher for the selector dialect produced by the payload serializer
//!
//! This is not a general CSS engine. It understands exactly what
//! [`crate::serialize::robust_selector`] emits: `#id` anchors,
//! `tag.class1.class2:nth-of-type(n)` segments, and the `" > "` child
//! combinator. The first segment matches anywhere in the document; every
//! following segment matches direct children only.

use crate::dom::document::{LiveElementHandle, NodeId, PageDocument};

#[derive(Debug, Clone, PartialEq)]
struct Segment {
    id: Option<String>,
    tag: Option<String>,
    classes: Vec<String>,
    nth_of_type: Option<usize>,
}

fn parse_segment(raw: &str) -> Option<Segment> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(id) = raw.strip_prefix('#') {
        if id.is_empty() {
            return None;
        }
        return Some(Segment { id: Some(id.to_string()), tag: None, classes: Vec::new(), nth_of_type: None });
    }

    let (head, nth_of_type) = match raw.split_once(":nth-of-type(") {
        Some((head, rest)) => {
            let digits = rest.strip_suffix(')')?;
            (head, Some(digits.parse::<usize>().ok()?))
        }
        None => (raw, None),
    };

    let mut parts = head.split('.');
    let tag = parts.next()?.to_ascii_lowercase();
    if tag.is_empty() {
        return None;
    }
    let classes: Vec<String> = parts.filter(|c| !c.is_empty()).map(str::to_string).collect();

    Some(Segment { id: None, tag: Some(tag), classes, nth_of_type })
}

fn parse_selector(selector: &str) -> Option<Vec<Segment>> {
    let segments: Option<Vec<Segment>> = selector.split(" > ").map(parse_segment).collect();
    segments.filter(|s| !s.is_empty())
}

impl PageDocument {
    fn matches_segment(&self, id: NodeId, segment: &Segment) -> bool {
        let handle = LiveElementHandle { id };
        if let Some(wanted) = &segment.id {
            return self.id_attr(handle) == Some(wanted.as_str());
        }
        if let Some(tag) = &segment.tag {
            if self.tag(handle) != tag {
                return false;
            }
        }
        if !segment.classes.is_empty() {
            let Some(class_attr) = self.attr(handle, "class") else {
                return false;
            };
            let tokens: Vec<&str> = class_attr.split_whitespace().collect();
            if !segment.classes.iter().all(|c| tokens.contains(&c.as_str())) {
                return false;
            }
        }
        if let Some(nth) = segment.nth_of_type {
            if self.nth_of_type_position(handle) != nth {
                return false;
            }
        }
        true
    }

    /// All elements matching a generated selector, in document order
    pub fn query_selector_all(&self, selector: &str) -> Vec<LiveElementHandle> {
        let Some(segments) = parse_selector(selector) else {
            log::debug!("Unparseable selector: {:?}", selector);
            return Vec::new();
        };

        // Anchor segment matches anywhere in the document
        let mut current: Vec<NodeId> = (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| self.matches_segment(id, &segments[0]))
            .collect();

        for segment in &segments[1..] {
            let mut next = Vec::new();
            for &parent in &current {
                for child in self.children(LiveElementHandle { id: parent }) {
                    if self.matches_segment(child.id, segment) {
                        next.push(child.id);
                    }
                }
            }
            current = next;
        }

        current.into_iter().map(|id| LiveElementHandle { id }).collect()
    }

    /// First element matching a generated selector
    pub fn query_selector(&self, selector: &str) -> Option<LiveElementHandle> {
        self.query_selector_all(selector).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::node::NodeSnapshot;

    fn doc() -> PageDocument {
        let root = NodeSnapshot::new("html").with_child(
            NodeSnapshot::new("body")
                .with_child(
                    NodeSnapshot::new("div")
                        .with_attr("id", "product-42")
                        .with_child(NodeSnapshot::new("span").with_attr("class", "price tag"))
                        .with_child(NodeSnapshot::new("span").with_attr("class", "label")),
                )
                .with_child(NodeSnapshot::new("div").with_attr("class", "row"))
                .with_child(NodeSnapshot::new("div").with_attr("class", "row")),
        );
        PageDocument::from_snapshot("t", "u", root)
    }

    #[test]
    fn test_id_anchor() {
        let doc = doc();
        let hit = doc.query_selector("#product-42").unwrap();
        assert_eq!(doc.tag(hit), "div");
        assert!(doc.query_selector("#missing").is_none());
    }

    #[test]
    fn test_child_combinator_with_classes() {
        let doc = doc();
        let hit = doc.query_selector("#product-42 > span.price").unwrap();
        assert_eq!(doc.attr(hit, "class"), Some("price tag"));
        assert!(doc.query_selector("#product-42 > span.missing").is_none());
    }

    #[test]
    fn test_nth_of_type_segment() {
        let doc = doc();
        let all = doc.query_selector_all("html > body > div.row:nth-of-type(3)");
        assert_eq!(all.len(), 1);
        // Second .row div is the third div child of body
        let hit = all[0];
        assert_eq!(doc.attr(hit, "class"), Some("row"));
        assert_eq!(doc.nth_of_type_position(hit), 3);
    }

    #[test]
    fn test_multiple_matches_in_document_order() {
        let doc = doc();
        let all = doc.query_selector_all("div.row");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_unparseable_selector_matches_nothing() {
        let doc = doc();
        assert!(doc.query_selector_all("").is_empty());
        assert!(doc.query_selector_all("div > > span").is_empty());
        assert!(doc.query_selector_all("span:nth-of-type(x)").is_empty());
    }
}
