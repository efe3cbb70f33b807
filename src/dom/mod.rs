//! Page document model
//!
//! The inspected page lives in another execution context; this module models
//! it as data. It includes:
//! - NodeSnapshot: the nested JSON dump format a page capture produces
//! - PageDocument: an arena-backed document with hit-testing and traversal
//! - LiveElementHandle: an opaque, non-serializable in-context node reference
//! - EventBus: document-level listener registry with capture/bubble ordering
//! - A matcher for the selector dialect the payload serializer generates

pub mod document;
pub mod events;
pub mod node;
pub mod query;

pub use document::{DocumentDump, LiveElementHandle, PageDocument, ReadyState};
pub use events::{EventBus, EventCtx, EventKind, ListenerId, ListenerTarget, PageEvent};
pub use node::{BoundingBox, NodeSnapshot};
