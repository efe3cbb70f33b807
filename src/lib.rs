//! # dompick
//!
//! A Rust library modeling the core of a visual element picker: hover over a
//! page, see a multi-level highlight hierarchy, click to capture a structured
//! snapshot of the element, and ask a remote service a question about it.
//!
//! ## Features
//!
//! - **Selector Engine**: hover tracking with depth-tiered highlight overlays
//!   (solid / dashed / dotted), click-to-pick with capture-phase preemption of
//!   page handlers, and a persistent selection border
//! - **Element Serialization**: size-capped, transport-safe payloads with a
//!   best-effort unique CSS selector per element
//! - **Messaging Relay**: async command routing between the panel and the
//!   page context, with the current selection persisted in a shared store
//! - **Panel Controller**: credit-gated natural-language questions with the
//!   picked element (or the whole page) attached as context
//!
//! ## Picking an element
//!
//! ```rust
//! use dompick::dom::{NodeSnapshot, PageDocument, PageEvent};
//! use dompick::page::PageRuntime;
//! use dompick::relay::Command;
//!
//! # fn main() {
//! let root = NodeSnapshot::new("html").with_child(
//!     NodeSnapshot::new("body").with_child(
//!         NodeSnapshot::new("div")
//!             .with_attr("id", "product-42")
//!             .with_bounds(0.0, 0.0, 400.0, 200.0)
//!             .with_child(
//!                 NodeSnapshot::new("span")
//!                     .with_attr("class", "price")
//!                     .with_text("$19.99")
//!                     .with_bounds(10.0, 10.0, 80.0, 20.0),
//!             ),
//!     ),
//! );
//! let doc = PageDocument::from_snapshot("Product", "https://shop.example", root);
//!
//! let mut page = PageRuntime::new(doc);
//! page.handle_command(&Command::StartSelection);
//! page.inject(PageEvent::PointerMove { x: 20.0, y: 15.0 });
//! let payload = page.inject(PageEvent::Click { x: 20.0, y: 15.0 }).unwrap();
//! assert_eq!(payload.robust_selector, "#product-42 > span.price");
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: the modeled page document, hit-testing, and event dispatch
//! - [`select`]: the selector/overlay engine
//! - [`serialize`]: element payloads and CSS selector generation
//! - [`snapshot`]: full-page capture
//! - [`store`]: the shared key-value mailbox with change notifications
//! - [`relay`]: the command protocol and routing task
//! - [`page`]: the page-embedded runtime and its driver handle
//! - [`panel`]: the UI-side orchestrator
//! - [`remote`]: Q&A, credits, and auth collaborator contracts
//! - [`error`]: error types and result alias

pub mod dom;
pub mod error;
pub mod page;
pub mod panel;
pub mod relay;
pub mod remote;
pub mod select;
pub mod serialize;
pub mod snapshot;
pub mod store;

pub use dom::{BoundingBox, LiveElementHandle, NodeSnapshot, PageDocument, PageEvent};
pub use error::{PickError, Result};
pub use page::{PageHandle, PageRuntime};
pub use panel::{PanelController, RemoteServices};
pub use relay::{spawn_relay, Command, CommandResponse, RelayHandle};
pub use select::{OverlayTheme, SelectionMode, SelectorEngine};
pub use serialize::{serialize_element, CaptureOptions, ElementPayload};
pub use snapshot::{PageSnapshot, SnapshotOptions};
pub use store::{SharedStore, PAGE_SNAPSHOT_KEY, SELECTED_ELEMENT_KEY};
