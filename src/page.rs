//! The page-embedded runtime (the content-script execution context)
//!
//! Owns the modeled document, the event bus, and the selector engine. The
//! synchronous core handles commands and injected input events; the task
//! wrapper connects it to the relay, schedules the deferred page snapshot,
//! and ships picked payloads out as ELEMENT_SELECTED messages.

use crate::dom::{EventBus, PageDocument, PageEvent, ReadyState};
use crate::error::{PickError, Result};
use crate::relay::{AckStatus, Command, CommandResponse, PageRequest, RelayHandle};
use crate::select::{HighlightOverlay, SelectionBorder, SelectionMode, SelectorEngine, Tooltip};
use crate::serialize::ElementPayload;
use crate::snapshot::{capture_page, PageSnapshot, SnapshotOptions};
use crate::store::SharedStore;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Introspection view of the picker state, for drivers and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub mode: SelectionMode,
    pub overlays: Vec<HighlightOverlay>,
    pub tooltip: Option<Tooltip>,
    pub selection_border: Option<SelectionBorder>,
    pub listener_count: usize,
}

/// Synchronous core of the page context
pub struct PageRuntime {
    document: PageDocument,
    bus: EventBus,
    engine: SelectorEngine,
}

impl PageRuntime {
    pub fn new(document: PageDocument) -> Self {
        Self::with_engine(document, SelectorEngine::default())
    }

    pub fn with_engine(document: PageDocument, engine: SelectorEngine) -> Self {
        Self { document, bus: EventBus::new(), engine }
    }

    pub fn document(&self) -> &PageDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut PageDocument {
        &mut self.document
    }

    pub fn engine(&self) -> &SelectorEngine {
        &self.engine
    }

    pub fn bus(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Handle a forwarded command, always producing a response
    pub fn handle_command(&mut self, command: &Command) -> CommandResponse {
        log::debug!("Page received {}", command.name());
        match command {
            Command::StartSelection => {
                self.engine.start(&mut self.bus);
                CommandResponse::Ack { status: AckStatus::SelectionModeStarted }
            }
            Command::CancelSelection => {
                self.engine.cancel(&mut self.bus);
                CommandResponse::Ack { status: AckStatus::SelectionModeCancelled }
            }
            Command::ClearHighlights => {
                self.engine.clear_highlights();
                CommandResponse::Ack { status: AckStatus::HighlightsCleared }
            }
            Command::GetPageHtml => CommandResponse::PageHtml {
                title: self.document.title().to_string(),
                url: self.document.url().to_string(),
                html: self.document.full_html(),
            },
            other => CommandResponse::Saved {
                success: false,
                message: format!("Unsupported command for page context: {}", other.name()),
            },
        }
    }

    /// Deliver an input event through the bus; returns a payload when the
    /// event finalized a pick
    pub fn inject(&mut self, event: PageEvent) -> Option<ElementPayload> {
        let Self { document, bus, engine } = self;
        bus.dispatch(&event, |ev, ctx| engine.handle_event(document, ev, ctx));
        engine.take_pending_pick()
    }

    /// Capture the current page for the snapshot slot
    pub fn capture_snapshot(&self) -> PageSnapshot {
        capture_page(&self.document)
    }

    /// Current picker state
    pub fn snapshot_engine(&self) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.engine.mode(),
            overlays: self.engine.scene().overlays().to_vec(),
            tooltip: self.engine.tooltip().cloned(),
            selection_border: self.engine.selection_border().cloned(),
            listener_count: self.bus.len(),
        }
    }
}

enum DriverMsg {
    Input { event: PageEvent, done: oneshot::Sender<()> },
    Inspect(oneshot::Sender<EngineSnapshot>),
}

/// Driver-side handle to a spawned page task
///
/// Injected events resolve once the page has fully reacted, including the
/// ELEMENT_SELECTED round-trip to the relay for a finalizing click.
#[derive(Clone)]
pub struct PageHandle {
    tx: mpsc::Sender<DriverMsg>,
}

impl PageHandle {
    /// Inject an input event and wait for the page to finish reacting
    pub async fn inject(&self, event: PageEvent) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(DriverMsg::Input { event, done: done_tx })
            .await
            .map_err(|_| PickError::PageUnavailable("page task is gone".to_string()))?;
        done_rx
            .await
            .map_err(|_| PickError::PageUnavailable("page task is gone".to_string()))
    }

    pub async fn pointer_move(&self, x: f64, y: f64) -> Result<()> {
        self.inject(PageEvent::PointerMove { x, y }).await
    }

    pub async fn click(&self, x: f64, y: f64) -> Result<()> {
        self.inject(PageEvent::Click { x, y }).await
    }

    pub async fn key_down(&self, key: impl Into<String>) -> Result<()> {
        self.inject(PageEvent::KeyDown { key: key.into() }).await
    }

    /// Read the current picker state
    pub async fn inspect(&self) -> Result<EngineSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(DriverMsg::Inspect(tx))
            .await
            .map_err(|_| PickError::PageUnavailable("page task is gone".to_string()))?;
        rx.await
            .map_err(|_| PickError::PageUnavailable("page task is gone".to_string()))
    }
}

/// Spawn a page task, register it with the relay, and schedule the snapshot
pub async fn spawn_page(
    mut runtime: PageRuntime,
    relay: RelayHandle,
    store: SharedStore,
    options: SnapshotOptions,
) -> Result<PageHandle> {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<PageRequest>(32);
    let (driver_tx, mut driver_rx) = mpsc::channel::<DriverMsg>(32);

    relay.attach_page(cmd_tx).await?;

    let capture_delay = match runtime.document().ready_state() {
        ReadyState::Loading => options.dom_ready_delay,
        ReadyState::Interactive | ReadyState::Complete => options.settle_delay,
    };

    tokio::spawn(async move {
        let capture_at = tokio::time::sleep(capture_delay);
        tokio::pin!(capture_at);
        let mut captured = false;
        // The relay dropping its command channel does not end the page; the
        // page lives until its driver is gone
        let mut commands_open = true;

        loop {
            tokio::select! {
                () = &mut capture_at, if !captured => {
                    captured = true;
                    capture_and_notify(&runtime, &store, &relay).await;
                }
                request = cmd_rx.recv(), if commands_open => {
                    match request {
                        Some(PageRequest { command, reply }) => {
                            let response = runtime.handle_command(&command);
                            let _ = reply.send(response);
                        }
                        None => commands_open = false,
                    }
                }
                msg = driver_rx.recv() => {
                    let Some(msg) = msg else { break };
                    match msg {
                        DriverMsg::Input { event, done } => {
                            if let Some(payload) = runtime.inject(event) {
                                ship_payload(&relay, payload).await;
                            }
                            let _ = done.send(());
                        }
                        DriverMsg::Inspect(reply) => {
                            let _ = reply.send(runtime.snapshot_engine());
                        }
                    }
                }
            }
        }
        log::debug!("Page task for {} ended", runtime.document().url());
    });

    Ok(PageHandle { tx: driver_tx })
}

async fn capture_and_notify(runtime: &PageRuntime, store: &SharedStore, relay: &RelayHandle) {
    let snapshot = runtime.capture_snapshot();
    let url = snapshot.url.clone();
    if let Err(e) = store.set_page_snapshot(&snapshot) {
        log::warn!("Failed to store page snapshot: {}", e);
        return;
    }

    // Best-effort notification; the relay may not be up yet and the page
    // does not care
    if let Err(e) = relay.send(Command::PageLoaded { url }).await {
        log::debug!("Page-load notification dropped: {}", e);
    }
}

async fn ship_payload(relay: &RelayHandle, payload: ElementPayload) {
    match relay.send(Command::ElementSelected { payload }).await {
        Ok(CommandResponse::Saved { success: true, .. }) => {
            log::debug!("Element payload persisted");
        }
        Ok(other) => log::warn!("Unexpected persistence reply: {:?}", other),
        Err(e) => log::warn!("Failed to ship element payload: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeSnapshot;

    fn runtime() -> PageRuntime {
        let root = NodeSnapshot::new("html")
            .with_bounds(0.0, 0.0, 800.0, 600.0)
            .with_child(
                NodeSnapshot::new("body")
                    .with_bounds(0.0, 0.0, 800.0, 600.0)
                    .with_child(
                        NodeSnapshot::new("button")
                            .with_attr("id", "go")
                            .with_text("Go")
                            .with_bounds(100.0, 100.0, 50.0, 20.0),
                    ),
            );
        PageRuntime::new(PageDocument::from_snapshot("T", "https://example.com", root))
    }

    #[test]
    fn test_command_round_trip() {
        let mut runtime = runtime();

        let response = runtime.handle_command(&Command::StartSelection);
        assert_eq!(response, CommandResponse::Ack { status: AckStatus::SelectionModeStarted });
        assert!(runtime.engine().is_active());

        let response = runtime.handle_command(&Command::CancelSelection);
        assert_eq!(
            response,
            CommandResponse::Ack { status: AckStatus::SelectionModeCancelled }
        );
        assert!(!runtime.engine().is_active());
    }

    #[test]
    fn test_cancel_when_idle_still_acks() {
        let mut runtime = runtime();
        let response = runtime.handle_command(&Command::CancelSelection);
        assert_eq!(
            response,
            CommandResponse::Ack { status: AckStatus::SelectionModeCancelled }
        );
    }

    #[test]
    fn test_get_page_html_is_live() {
        let mut runtime = runtime();
        let response = runtime.handle_command(&Command::GetPageHtml);
        match response {
            CommandResponse::PageHtml { title, url, html } => {
                assert_eq!(title, "T");
                assert_eq!(url, "https://example.com");
                assert!(html.contains("<button id=\"go\">"));
            }
            other => panic!("expected PageHtml, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_command_still_responds() {
        let mut runtime = runtime();
        let response = runtime.handle_command(&Command::GetData);
        match response {
            CommandResponse::Saved { success, .. } => assert!(!success),
            other => panic!("expected Saved, got {:?}", other),
        }
    }

    #[test]
    fn test_inject_produces_payload_on_pick() {
        let mut runtime = runtime();
        runtime.handle_command(&Command::StartSelection);

        assert!(runtime.inject(PageEvent::PointerMove { x: 110.0, y: 105.0 }).is_none());
        let payload = runtime.inject(PageEvent::Click { x: 110.0, y: 105.0 }).unwrap();
        assert_eq!(payload.tag_name, "button");
        assert_eq!(payload.robust_selector, "#go");
    }

    #[test]
    fn test_engine_snapshot_reports_listeners() {
        let mut runtime = runtime();
        assert_eq!(runtime.snapshot_engine().listener_count, 0);

        runtime.handle_command(&Command::StartSelection);
        let snapshot = runtime.snapshot_engine();
        assert_eq!(snapshot.listener_count, 3);
        assert_eq!(snapshot.mode, SelectionMode::Active);
        assert!(snapshot.tooltip.is_some());
    }
}
