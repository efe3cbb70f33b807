//! Input event dispatch for the page context
//!
//! Models the document-level listener mechanics the picker depends on:
//! listeners are registered per event kind with an optional capture flag,
//! capture listeners always run ahead of page-level (bubble) listeners, and a
//! handler can stop propagation and prevent the default action. Listener
//! removal requested mid-dispatch is applied once the dispatch completes, so
//! a click handler can tear its own listeners down safely.

use serde::{Deserialize, Serialize};

/// An input event delivered to the page context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageEvent {
    PointerMove { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    KeyDown { key: String },
}

impl PageEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PageEvent::PointerMove { .. } => EventKind::PointerMove,
            PageEvent::Click { .. } => EventKind::Click,
            PageEvent::KeyDown { .. } => EventKind::KeyDown,
        }
    }
}

/// Event kinds a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PointerMove,
    Click,
    KeyDown,
}

/// Identifier of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-dispatch state handlers can act on
#[derive(Default)]
pub struct EventCtx {
    propagation_stopped: bool,
    default_prevented: bool,
    removals: Vec<ListenerId>,
}

impl EventCtx {
    /// Stop delivery to any later listener in this dispatch
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Suppress the page's default reaction to this event
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Request removal of a listener once this dispatch completes
    pub fn remove_listener(&mut self, id: ListenerId) {
        self.removals.push(id);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// What a listener does when the event reaches it
pub enum ListenerTarget {
    /// Forwarded to the dispatch-time router (the picker engine's listeners)
    Routed,
    /// An in-page handler (the inspected page's own scripts)
    Callback(Box<dyn FnMut(&PageEvent, &mut EventCtx) + Send + Sync>),
}

struct Listener {
    id: ListenerId,
    kind: EventKind,
    capture: bool,
    target: ListenerTarget,
}

/// Document-level listener registry with capture/bubble ordering
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its id
    pub fn add_listener(&mut self, kind: EventKind, capture: bool, target: ListenerTarget) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener { id, kind, capture, target });
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|l| l.id == id)
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver an event: capture listeners first, then bubble listeners, each
    /// phase in registration order, honoring `stop_propagation` between
    /// listeners. `route` is invoked for every `Routed` listener reached.
    pub fn dispatch(
        &mut self,
        event: &PageEvent,
        mut route: impl FnMut(&PageEvent, &mut EventCtx),
    ) -> EventCtx {
        let mut ctx = EventCtx::default();

        let mut ordered: Vec<ListenerId> = Vec::new();
        for phase_capture in [true, false] {
            ordered.extend(
                self.listeners
                    .iter()
                    .filter(|l| l.capture == phase_capture && l.kind == event.kind())
                    .map(|l| l.id),
            );
        }

        for id in ordered {
            if ctx.propagation_stopped {
                break;
            }
            let Some(listener) = self.listeners.iter_mut().find(|l| l.id == id) else {
                continue;
            };
            match &mut listener.target {
                ListenerTarget::Routed => route(event, &mut ctx),
                ListenerTarget::Callback(handler) => handler(event, &mut ctx),
            }
        }

        for id in std::mem::take(&mut ctx.removals) {
            self.remove_listener(id);
        }
        ctx
    }
}
