//! Full-page capture, independent of element selection
//!
//! A snapshot of the whole document is taken shortly after load (late content
//! gets a fixed settle delay) and written to the shared store under a fixed
//! key, unconditionally overwriting whatever a previous page left there.

use crate::dom::PageDocument;
use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One captured page: metadata plus the full serialized HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageSnapshot {
    pub title: String,
    pub url: String,
    pub html: String,
    #[serde(rename = "htmlSize")]
    pub html_size: usize,
    pub timestamp: String,
}

/// Delays applied before capturing, so late-settling content is included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Delay after the load event (and after attach on an already-loaded page)
    pub settle_delay: Duration,
    /// Delay after DOMContentLoaded when the page was still loading at attach
    pub dom_ready_delay: Duration,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            dom_ready_delay: Duration::from_millis(1000),
        }
    }
}

impl SnapshotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: override the post-load settle delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Builder method: override the DOMContentLoaded delay
    pub fn with_dom_ready_delay(mut self, delay: Duration) -> Self {
        self.dom_ready_delay = delay;
        self
    }
}

/// Capture the current page as a snapshot
pub fn capture_page(doc: &PageDocument) -> PageSnapshot {
    let html = doc.full_html();
    let html_size = html.len();
    log::debug!("Page HTML captured: {} ({} bytes)", doc.title(), html_size);
    PageSnapshot {
        title: doc.title().to_string(),
        url: doc.url().to_string(),
        html,
        html_size,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}
