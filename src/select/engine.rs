use crate::dom::{
    BoundingBox, EventBus, EventCtx, EventKind, ListenerId, ListenerTarget, LiveElementHandle,
    PageDocument, PageEvent,
};
use crate::select::overlay::{
    HighlightOverlay, OverlayScene, OverlayTheme, SelectionBorder, Tooltip, OVERLAY_BASE_Z,
    SELECTION_BORDER_Z,
};
use crate::serialize::{serialize_element, CaptureOptions, ElementPayload};
use serde::{Deserialize, Serialize};

/// Whether selection mode is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Idle,
    Active,
}

/// The three listener ids cached while selection mode is active
#[derive(Debug, Clone, Copy)]
struct ListenerSet {
    pointer_move: ListenerId,
    click: ListenerId,
    key_down: ListenerId,
}

impl ListenerSet {
    fn ids(&self) -> [ListenerId; 3] {
        [self.pointer_move, self.click, self.key_down]
    }
}

/// The in-page element picker
///
/// Owns everything selection mode touches: the overlay scene, the instruction
/// tooltip, the cached listener ids, and the persistent selection border. The
/// state machine is `Idle -> Active -> Idle`; teardown on either exit path is
/// idempotent and total.
pub struct SelectorEngine {
    mode: SelectionMode,
    theme: OverlayTheme,
    capture: CaptureOptions,
    listeners: Option<ListenerSet>,
    scene: OverlayScene,
    tooltip: Option<Tooltip>,
    selection_border: Option<SelectionBorder>,
    pending_pick: Option<ElementPayload>,
}

impl Default for SelectorEngine {
    fn default() -> Self {
        Self::new(OverlayTheme::default(), CaptureOptions::default())
    }
}

impl SelectorEngine {
    pub fn new(theme: OverlayTheme, capture: CaptureOptions) -> Self {
        Self {
            mode: SelectionMode::Idle,
            theme,
            capture,
            listeners: None,
            scene: OverlayScene::default(),
            tooltip: None,
            selection_border: None,
            pending_pick: None,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode == SelectionMode::Active
    }

    /// Current hover overlays (empty while idle)
    pub fn scene(&self) -> &OverlayScene {
        &self.scene
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn selection_border(&self) -> Option<&SelectionBorder> {
        self.selection_border.as_ref()
    }

    /// Payload produced by the last finalizing click, if not yet collected
    pub fn take_pending_pick(&mut self) -> Option<ElementPayload> {
        self.pending_pick.take()
    }

    /// Enter selection mode: install the tooltip and the three listeners
    ///
    /// The click listener is registered with capture so it preempts the
    /// page's own click handlers. Returns false (and does nothing) when
    /// selection mode is already active.
    pub fn start(&mut self, bus: &mut EventBus) -> bool {
        if self.is_active() {
            log::debug!("Selection mode already active, start ignored");
            return false;
        }
        log::info!("Selection mode started");

        self.tooltip = Some(Tooltip::default());
        self.scene.clear();
        self.listeners = Some(ListenerSet {
            pointer_move: bus.add_listener(EventKind::PointerMove, false, ListenerTarget::Routed),
            click: bus.add_listener(EventKind::Click, true, ListenerTarget::Routed),
            key_down: bus.add_listener(EventKind::KeyDown, false, ListenerTarget::Routed),
        });
        self.mode = SelectionMode::Active;
        true
    }

    /// Leave selection mode without producing a payload
    ///
    /// Idempotent: calling while idle is a no-op. Also removes the persistent
    /// selection border, leaving no picker-owned decoration behind.
    pub fn cancel(&mut self, bus: &mut EventBus) {
        if let Some(set) = self.listeners.take() {
            for id in set.ids() {
                bus.remove_listener(id);
            }
        }
        if self.is_active() {
            log::info!("Selection mode cancelled");
        }
        self.scene.clear();
        self.tooltip = None;
        self.selection_border = None;
        self.mode = SelectionMode::Idle;
    }

    /// Remove the persistent selection border only; stored payloads are
    /// untouched and selection mode is unaffected
    pub fn clear_highlights(&mut self) {
        if self.selection_border.take().is_some() {
            log::debug!("Persistent selection border removed");
        }
    }

    /// Router entry point for events delivered through the bus
    pub fn handle_event(&mut self, doc: &PageDocument, event: &PageEvent, ctx: &mut EventCtx) {
        match *event {
            PageEvent::PointerMove { x, y } => self.on_pointer_move(doc, x, y),
            PageEvent::Click { x, y } => self.on_click(doc, x, y, ctx),
            PageEvent::KeyDown { ref key } => {
                if key == "Escape" {
                    self.teardown_via_ctx(ctx);
                    self.selection_border = None;
                    log::info!("Selection mode cancelled");
                }
            }
        }
    }

    fn hit_ignoring_chrome(&self, doc: &PageDocument, x: f64, y: f64) -> Option<LiveElementHandle> {
        if let Some(tooltip) = &self.tooltip {
            if tooltip.rect.contains(x, y) {
                return None;
            }
        }
        let el = doc.element_from_point(x, y)?;
        match doc.tag(el) {
            "body" | "html" => None,
            _ => Some(el),
        }
    }

    fn on_pointer_move(&mut self, doc: &PageDocument, x: f64, y: f64) {
        if !self.is_active() {
            return;
        }

        // Full rebuild every move; hover frequency is low relative to the
        // cost of diffing
        self.scene.clear();

        let Some(el) = self.hit_ignoring_chrome(doc, x, y) else {
            return;
        };

        for (depth, ancestor) in doc.hierarchy_from(el).into_iter().enumerate() {
            let Some(rect) = doc.bounds(ancestor) else {
                continue;
            };
            self.scene.push(HighlightOverlay {
                rect,
                depth,
                style: self.theme.depth_style(depth).clone(),
                z_index: OVERLAY_BASE_Z - depth as i32,
            });
        }
    }

    fn on_click(&mut self, doc: &PageDocument, x: f64, y: f64, ctx: &mut EventCtx) {
        if !self.is_active() {
            return;
        }

        // The selection click must never reach the underlying page
        ctx.prevent_default();
        ctx.stop_propagation();

        let Some(el) = self.hit_ignoring_chrome(doc, x, y) else {
            return;
        };

        let payload = match serialize_element(doc, el, &self.capture) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("Failed to serialize picked element: {}", e);
                self.teardown_via_ctx(ctx);
                return;
            }
        };
        log::info!(
            "Element selected: <{}> ({} bytes of HTML, {} children)",
            payload.tag_name,
            payload.full_html_size,
            payload.children_count
        );

        self.teardown_via_ctx(ctx);

        // Document-relative placement so the border survives scrolling;
        // replacing the field drops any prior border
        if let Some(rect) = doc.bounds(el) {
            let (scroll_x, scroll_y) = doc.scroll_offset();
            self.selection_border = Some(SelectionBorder {
                rect: BoundingBox::new(
                    rect.x + scroll_x,
                    rect.y + scroll_y,
                    rect.width,
                    rect.height,
                ),
                style: self.theme.selection.clone(),
                z_index: SELECTION_BORDER_Z,
            });
        }

        self.pending_pick = Some(payload);
    }

    /// Teardown from inside a dispatch: listener removal is deferred to the
    /// bus, everything else is immediate
    fn teardown_via_ctx(&mut self, ctx: &mut EventCtx) {
        if let Some(set) = self.listeners.take() {
            for id in set.ids() {
                ctx.remove_listener(id);
            }
        }
        self.scene.clear();
        self.tooltip = None;
        self.mode = SelectionMode::Idle;
    }
}
