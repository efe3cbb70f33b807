//! End-to-end selection flows over the real relay, store, and page task

use async_trait::async_trait;
use dompick::dom::{NodeSnapshot, PageDocument};
use dompick::page::{spawn_page, PageHandle, PageRuntime};
use dompick::panel::{PanelController, RemoteServices};
use dompick::relay::spawn_relay;
use dompick::remote::{AnswerEnvelope, AuthGateway, AuthSession, CreditBalance, CreditLedger, QaBackend};
use dompick::select::{BorderStyle, SelectionMode};
use dompick::snapshot::SnapshotOptions;
use dompick::store::SharedStore;
use dompick::{PickError, RelayHandle, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn product_page() -> PageDocument {
    let root = NodeSnapshot::new("html")
        .with_bounds(0.0, 0.0, 1024.0, 768.0)
        .with_child(
            NodeSnapshot::new("body")
                .with_bounds(0.0, 0.0, 1024.0, 768.0)
                .with_child(
                    NodeSnapshot::new("div")
                        .with_attr("id", "product-42")
                        .with_bounds(100.0, 100.0, 400.0, 200.0)
                        .with_child(
                            NodeSnapshot::new("span")
                                .with_attr("class", "price")
                                .with_text("$19.99")
                                .with_bounds(120.0, 120.0, 80.0, 20.0),
                        ),
                ),
        );
    PageDocument::from_snapshot("Product 42", "https://shop.example/item/42", root)
}

struct StubQa {
    calls: Mutex<Vec<(String, Option<String>)>>,
}

#[async_trait]
impl QaBackend for StubQa {
    async fn ask(&self, question: &str, html: Option<&str>) -> Result<AnswerEnvelope> {
        self.calls
            .lock()
            .unwrap()
            .push((question.to_string(), html.map(str::to_string)));
        Ok(AnswerEnvelope {
            success: true,
            data: serde_json::json!({"price": "$19.99"}),
            message: Some("extracted".to_string()),
        })
    }
}

struct StubLedger {
    balance: Mutex<CreditBalance>,
    uses: AtomicUsize,
}

#[async_trait]
impl CreditLedger for StubLedger {
    async fn balance(&self) -> Result<CreditBalance> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn record_use(&self) -> Result<CreditBalance> {
        self.uses.fetch_add(1, Ordering::SeqCst);
        let mut balance = self.balance.lock().unwrap();
        balance.credits_used += 1;
        Ok(*balance)
    }
}

struct StubAuth;

#[async_trait]
impl AuthGateway for StubAuth {
    async fn request_code(&self, _email: &str) -> Result<()> {
        Ok(())
    }

    async fn verify_code(&self, email: &str, _code: &str) -> Result<AuthSession> {
        Ok(AuthSession {
            user_id: "u-1".to_string(),
            email: email.to_string(),
            access_token: "tok".to_string(),
        })
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(())
    }
}

struct Harness {
    store: SharedStore,
    relay: RelayHandle,
    page: PageHandle,
    panel: PanelController,
    qa: Arc<StubQa>,
    ledger: Arc<StubLedger>,
}

async fn harness(balance: CreditBalance) -> Harness {
    let store = SharedStore::new();
    let relay = spawn_relay(store.clone());

    let runtime = PageRuntime::new(product_page());
    let options = SnapshotOptions::new().with_settle_delay(Duration::from_millis(10));
    let page = spawn_page(runtime, relay.clone(), store.clone(), options)
        .await
        .expect("page should attach");

    let qa = Arc::new(StubQa { calls: Mutex::new(Vec::new()) });
    let ledger = Arc::new(StubLedger { balance: Mutex::new(balance), uses: AtomicUsize::new(0) });
    let services = RemoteServices {
        qa: qa.clone(),
        ledger: ledger.clone(),
        auth: Arc::new(StubAuth),
    };
    let panel = PanelController::new(relay.clone(), store.clone(), services);

    Harness { store, relay, page, panel, qa, ledger }
}

#[tokio::test]
async fn pick_flow_from_hover_to_persisted_payload() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    assert!(h.panel.selection_active());

    // Hovering the price span highlights it and its parent div
    h.page.pointer_move(130.0, 125.0).await.unwrap();
    let snapshot = h.page.inspect().await.unwrap();
    assert_eq!(snapshot.mode, SelectionMode::Active);
    assert_eq!(snapshot.listener_count, 3);
    assert_eq!(snapshot.overlays.len(), 2);
    assert_eq!(snapshot.overlays[0].style.border, BorderStyle::Solid);
    assert_eq!(snapshot.overlays[1].style.border, BorderStyle::Dashed);

    // Clicking finalizes the pick and persists the payload
    h.page.click(130.0, 125.0).await.unwrap();

    let payload = h.store.selected_element().expect("payload should be persisted");
    assert_eq!(payload.tag_name, "span");
    assert_eq!(payload.visible_text, "$19.99");
    assert_eq!(payload.attributes.get("class"), Some(&"price".to_string()));
    assert_eq!(payload.robust_selector, "#product-42 > span.price");
    assert_eq!(payload.page_url, "https://shop.example/item/42");

    // Selection mode is over: no overlays, no tooltip, no listeners, but the
    // persistent border remains
    let snapshot = h.page.inspect().await.unwrap();
    assert_eq!(snapshot.mode, SelectionMode::Idle);
    assert_eq!(snapshot.listener_count, 0);
    assert!(snapshot.overlays.is_empty());
    assert!(snapshot.tooltip.is_none());
    assert!(snapshot.selection_border.is_some());
}

#[tokio::test]
async fn clear_highlights_keeps_stored_payload() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    h.page.click(130.0, 125.0).await.unwrap();
    assert!(h.store.selected_element().is_some());

    h.panel.clear_highlights().await.unwrap();

    let snapshot = h.page.inspect().await.unwrap();
    assert!(snapshot.selection_border.is_none());
    // Clearing visuals is independent of clearing selection data
    assert!(h.store.selected_element().is_some());
}

#[tokio::test]
async fn remove_selection_clears_data_and_border() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    h.page.click(130.0, 125.0).await.unwrap();

    h.panel.remove_selection().await.unwrap();

    assert!(h.store.selected_element().is_none());
    let snapshot = h.page.inspect().await.unwrap();
    assert!(snapshot.selection_border.is_none());
}

#[tokio::test]
async fn escape_cancels_without_payload() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    h.page.pointer_move(130.0, 125.0).await.unwrap();
    h.page.key_down("Escape").await.unwrap();

    let snapshot = h.page.inspect().await.unwrap();
    assert_eq!(snapshot.mode, SelectionMode::Idle);
    assert_eq!(snapshot.listener_count, 0);
    assert!(snapshot.overlays.is_empty());
    assert!(h.store.selected_element().is_none());
}

#[tokio::test]
async fn cancel_twice_is_idempotent() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    h.panel.cancel_selection().await.unwrap();
    let first = h.page.inspect().await.unwrap();

    h.panel.cancel_selection().await.unwrap();
    let second = h.page.inspect().await.unwrap();

    assert_eq!(first.mode, SelectionMode::Idle);
    assert_eq!(second.mode, SelectionMode::Idle);
    assert_eq!(first.listener_count, 0);
    assert_eq!(second.listener_count, 0);
    assert!(second.overlays.is_empty());
}

#[tokio::test]
async fn new_pick_replaces_prior_selection() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    h.page.click(130.0, 125.0).await.unwrap();
    assert_eq!(h.store.selected_element().unwrap().tag_name, "span");

    // Pick the surrounding div on a second pass
    h.panel.start_selection().await.unwrap();
    h.page.click(450.0, 250.0).await.unwrap();
    assert_eq!(h.store.selected_element().unwrap().tag_name, "div");
}

#[tokio::test]
async fn page_snapshot_captured_after_settle_delay() {
    let h = harness(CreditBalance::new(0, 5)).await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = h.store.page_snapshot().expect("snapshot should be captured");
    assert_eq!(snapshot.title, "Product 42");
    assert_eq!(snapshot.url, "https://shop.example/item/42");
    assert!(snapshot.html.contains("id=\"product-42\""));
    assert_eq!(snapshot.html_size, snapshot.html.len());
}

#[tokio::test]
async fn exhausted_credits_block_query_end_to_end() {
    let mut h = harness(CreditBalance::new(5, 5)).await;
    h.panel.refresh_credits().await.unwrap();

    h.panel.start_selection().await.unwrap();
    h.page.click(130.0, 125.0).await.unwrap();

    let err = h.panel.ask("What is the price?").await.unwrap_err();
    assert!(matches!(err, PickError::CreditsExhausted));

    // The blocked attempt reached nothing and changed nothing
    assert!(h.qa.calls.lock().unwrap().is_empty());
    assert_eq!(h.ledger.uses.load(Ordering::SeqCst), 0);
    assert_eq!(h.panel.credits().unwrap(), CreditBalance::new(5, 5));
}

#[tokio::test]
async fn ask_attaches_selected_element_html() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    h.page.click(130.0, 125.0).await.unwrap();
    let payload = h.store.selected_element().unwrap();

    let answer = h.panel.ask("What is the price?").await.unwrap();
    assert!(answer.success);
    assert_eq!(answer.data["price"], "$19.99");

    let calls = h.qa.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.as_deref(), Some(payload.outer_html_snippet.as_str()));
    assert_eq!(h.ledger.uses.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ask_falls_back_to_page_snapshot() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    // Wait for the snapshot capture; no element is selected
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.panel.ask("Summarize this page").await.unwrap();

    let calls = h.qa.calls.lock().unwrap();
    let html = calls[0].1.as_deref().unwrap();
    assert!(html.contains("id=\"product-42\""));
}

#[tokio::test]
async fn detached_page_treated_as_already_cancelled() {
    let mut h = harness(CreditBalance::new(0, 5)).await;

    h.panel.start_selection().await.unwrap();
    // The tab navigates away: the page context disappears
    h.relay.detach_page().await.unwrap();

    h.panel.cancel_selection().await.unwrap();
    assert!(!h.panel.selection_active());

    // But starting a new selection needs a live page
    let err = h.panel.start_selection().await.unwrap_err();
    assert!(matches!(err, PickError::PageUnavailable(_)));
}

#[tokio::test]
async fn live_page_html_round_trip() {
    let h = harness(CreditBalance::new(0, 5)).await;
    let (title, url, html) = h.panel.live_page_html().await.unwrap();
    assert_eq!(title, "Product 42");
    assert_eq!(url, "https://shop.example/item/42");
    assert!(html.contains("class=\"price\""));
}
