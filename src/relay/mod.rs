//! Command routing between the panel and the page context
//!
//! The relay is a stateless router between exactly two peers: the panel
//! controller and the per-page picker runtime. Panel-originated commands are
//! forwarded over the page channel and their replies forwarded back; the one
//! piece of work the relay does itself is persisting a selected element into
//! the shared store, replying only after the write has completed. The durable
//! state lives in [`crate::store::SharedStore`], never in the relay.

use crate::error::{PickError, Result};
use crate::serialize::ElementPayload;
use crate::store::SharedStore;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// Wire commands exchanged between panel, relay, and page
///
/// JSON-shaped with a `type` discriminator, e.g.
/// `{"type": "ELEMENT_SELECTED", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum Command {
    /// panel -> page: enter selection mode
    #[serde(rename = "START_SELECTION")]
    StartSelection,

    /// panel -> page: leave selection mode without a payload
    #[serde(rename = "CANCEL_SELECTION")]
    CancelSelection,

    /// panel -> page: remove the persistent selection border only
    #[serde(rename = "CLEAR_HIGHLIGHTS")]
    ClearHighlights,

    /// page -> relay: persist a picked element, overwriting the prior one
    #[serde(rename = "ELEMENT_SELECTED")]
    ElementSelected { payload: ElementPayload },

    /// panel -> page: read the live page HTML
    #[serde(rename = "GET_PAGE_HTML")]
    GetPageHtml,

    /// Placeholder data probe answered by the relay itself
    #[serde(rename = "GET_DATA")]
    GetData,

    /// page -> relay: best-effort page-load notification
    #[serde(rename = "PAGE_LOADED")]
    PageLoaded { url: String },
}

impl Command {
    /// The wire name of the command, for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartSelection => "START_SELECTION",
            Command::CancelSelection => "CANCEL_SELECTION",
            Command::ClearHighlights => "CLEAR_HIGHLIGHTS",
            Command::ElementSelected { .. } => "ELEMENT_SELECTED",
            Command::GetPageHtml => "GET_PAGE_HTML",
            Command::GetData => "GET_DATA",
            Command::PageLoaded { .. } => "PAGE_LOADED",
        }
    }
}

/// Ack statuses for the selection-lifecycle commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    SelectionModeStarted,
    SelectionModeCancelled,
    HighlightsCleared,
}

/// Replies carried back over the command channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CommandResponse {
    /// Lifecycle ack, e.g. `{"status": "selection_mode_started"}`
    Ack { status: AckStatus },
    /// Persistence ack for ELEMENT_SELECTED
    Saved { success: bool, message: String },
    /// Live page data for GET_PAGE_HTML
    PageHtml { title: String, url: String, html: String },
    /// Data probe reply
    Data { success: bool, data: Value },
}

/// A command forwarded to the page context, with its reply channel
///
/// The reply sender keeps the response path open across any asynchronous
/// work; dropping it without sending is how a reply gets silently lost, so
/// every handler must send on every path.
pub struct PageRequest {
    pub command: Command,
    pub reply: oneshot::Sender<CommandResponse>,
}

/// Sender half of the page context's command channel
pub type PageConnection = mpsc::Sender<PageRequest>;

enum RelayMsg {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<CommandResponse>>,
    },
    AttachPage(PageConnection),
    DetachPage,
}

/// Cloneable handle used by both the panel and the page to reach the relay
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayMsg>,
}

impl RelayHandle {
    /// Send a command and await its response
    pub async fn send(&self, command: Command) -> Result<CommandResponse> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RelayMsg::Command { command, reply: reply_tx })
            .await
            .map_err(|_| PickError::RelayUnavailable("relay task is gone".to_string()))?;
        reply_rx
            .await
            .map_err(|_| PickError::RelayUnavailable("relay dropped the reply".to_string()))?
    }

    /// Register the current page context; replaces any prior one
    pub async fn attach_page(&self, connection: PageConnection) -> Result<()> {
        self.tx
            .send(RelayMsg::AttachPage(connection))
            .await
            .map_err(|_| PickError::RelayUnavailable("relay task is gone".to_string()))
    }

    /// Drop the current page context (tab closed or navigated away)
    pub async fn detach_page(&self) -> Result<()> {
        self.tx
            .send(RelayMsg::DetachPage)
            .await
            .map_err(|_| PickError::RelayUnavailable("relay task is gone".to_string()))
    }
}

struct Relay {
    store: SharedStore,
    page: Option<PageConnection>,
}

impl Relay {
    async fn run(mut self, mut rx: mpsc::Receiver<RelayMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                RelayMsg::AttachPage(connection) => {
                    log::debug!("Page context attached");
                    self.page = Some(connection);
                }
                RelayMsg::DetachPage => {
                    log::debug!("Page context detached");
                    self.page = None;
                }
                RelayMsg::Command { command, reply } => {
                    let response = match command {
                        Command::ElementSelected { payload } => self.persist(payload),
                        Command::GetData => Ok(CommandResponse::Data {
                            success: true,
                            data: Value::Object(serde_json::Map::new()),
                        }),
                        Command::PageLoaded { url } => {
                            log::debug!("Page loaded: {}", url);
                            Ok(CommandResponse::Data {
                                success: true,
                                data: Value::Object(serde_json::Map::new()),
                            })
                        }
                        // The round-trip to the page must not block this
                        // loop: the page itself sends commands here while
                        // one of its own may be in flight
                        forwarded => {
                            let page = self.page.clone();
                            tokio::spawn(async move {
                                let response = forward_to_page(page, forwarded).await;
                                // The caller may have given up waiting
                                let _ = reply.send(response);
                            });
                            continue;
                        }
                    };
                    let _ = reply.send(response);
                }
            }
        }
    }

    /// Persist a picked element; the reply is produced only after the write
    /// finished, success or not
    fn persist(&self, payload: ElementPayload) -> Result<CommandResponse> {
        log::info!("Persisting selected <{}> element", payload.tag_name);
        match self.store.set_selected_element(&payload) {
            Ok(()) => Ok(CommandResponse::Saved {
                success: true,
                message: "Element saved".to_string(),
            }),
            Err(e) => Ok(CommandResponse::Saved { success: false, message: e.to_string() }),
        }
    }
}

async fn forward_to_page(
    page: Option<PageConnection>,
    command: Command,
) -> Result<CommandResponse> {
    let Some(page) = page else {
        return page_gone(command);
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    let name = command.name();
    let send = page
        .send(PageRequest { command: command.clone(), reply: reply_tx })
        .await;
    if send.is_err() {
        log::debug!("Page channel closed while forwarding {}", name);
        return page_gone(command);
    }

    match reply_rx.await {
        Ok(response) => Ok(response),
        Err(_) => {
            log::debug!("Page dropped the reply to {}", name);
            page_gone(command)
        }
    }
}

/// Resolution for commands aimed at a page context that no longer exists
///
/// Cancel-shaped commands are treated as already done; data-bearing commands
/// surface the missing page to the caller.
fn page_gone(command: Command) -> Result<CommandResponse> {
    match command {
        Command::CancelSelection => Ok(CommandResponse::Ack {
            status: AckStatus::SelectionModeCancelled,
        }),
        Command::ClearHighlights => Ok(CommandResponse::Ack {
            status: AckStatus::HighlightsCleared,
        }),
        other => Err(PickError::PageUnavailable(format!(
            "no page context to receive {}",
            other.name()
        ))),
    }
}

/// Start the relay task; one relay exists per session
pub fn spawn_relay(store: SharedStore) -> RelayHandle {
    let (tx, rx) = mpsc::channel(32);
    let relay = Relay { store, page: None };
    tokio::spawn(relay.run(rx));
    RelayHandle { tx }
}
