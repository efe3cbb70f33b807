//! Panel controller: the UI-side orchestrator
//!
//! Issues selection-lifecycle commands through the relay, reads the shared
//! store for the current selection and page snapshot, gates questions on the
//! credit balance, and forwards questions with HTML context to the remote
//! Q&A backend. The panel's view of selection mode is a mirror, not the
//! truth: the page can cancel on its own (Escape, navigation), and every
//! command path here tolerates that.

use crate::error::{PickError, Result};
use crate::relay::{Command, CommandResponse, RelayHandle};
use crate::remote::{
    validate_email, AnswerEnvelope, AuthGateway, AuthSession, CreditBalance, CreditLedger,
    QaBackend,
};
use crate::serialize::ElementPayload;
use crate::snapshot::PageSnapshot;
use crate::store::{SharedStore, StoreChange};
use std::sync::Arc;
use tokio::sync::broadcast;

/// The external services the panel talks to
#[derive(Clone)]
pub struct RemoteServices {
    pub qa: Arc<dyn QaBackend>,
    pub ledger: Arc<dyn CreditLedger>,
    pub auth: Arc<dyn AuthGateway>,
}

/// Result of mounting the panel: the pre-existing selection plus the change
/// stream, both reading the same store key and shape
pub struct PanelMount {
    pub initial_selection: Option<ElementPayload>,
    pub changes: broadcast::Receiver<StoreChange>,
}

/// The panel-side orchestrator
pub struct PanelController {
    relay: RelayHandle,
    store: SharedStore,
    services: RemoteServices,
    selection_active: bool,
    credits: Option<CreditBalance>,
    session: Option<AuthSession>,
}

impl PanelController {
    pub fn new(relay: RelayHandle, store: SharedStore, services: RemoteServices) -> Self {
        Self {
            relay,
            store,
            services,
            selection_active: false,
            credits: None,
            session: None,
        }
    }

    /// One-shot read plus subscription, in that order of use: subscribe
    /// first so no change between the two can be missed
    pub fn mount(&self) -> PanelMount {
        let changes = self.store.subscribe();
        let initial_selection = self.store.selected_element();
        PanelMount { initial_selection, changes }
    }

    /// The panel's mirrored selection flag; may briefly disagree with the page
    pub fn selection_active(&self) -> bool {
        self.selection_active
    }

    /// Last fetched credit balance
    pub fn credits(&self) -> Option<CreditBalance> {
        self.credits
    }

    pub fn credits_exhausted(&self) -> bool {
        self.credits.map(|c| c.exhausted()).unwrap_or(false)
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    /// Current selection, straight from the store
    pub fn selected_element(&self) -> Option<ElementPayload> {
        self.store.selected_element()
    }

    /// Current page snapshot, straight from the store
    pub fn page_snapshot(&self) -> Option<PageSnapshot> {
        self.store.page_snapshot()
    }

    /// Ask the page to enter selection mode
    pub async fn start_selection(&mut self) -> Result<()> {
        self.relay.send(Command::StartSelection).await?;
        self.selection_active = true;
        Ok(())
    }

    /// Ask the page to leave selection mode
    ///
    /// A page that is already gone counts as cancelled; the mirror flag
    /// drops either way.
    pub async fn cancel_selection(&mut self) -> Result<()> {
        self.selection_active = false;
        self.relay.send(Command::CancelSelection).await?;
        Ok(())
    }

    /// Remove the persistent selection border; stored data is untouched
    pub async fn clear_highlights(&self) -> Result<()> {
        self.relay.send(Command::ClearHighlights).await?;
        Ok(())
    }

    /// Forget the selected element: clear the store slot and the border
    pub async fn remove_selection(&mut self) -> Result<()> {
        self.store.remove_selected_element();
        self.clear_highlights().await
    }

    /// Read the live page HTML (not the stored snapshot)
    pub async fn live_page_html(&self) -> Result<(String, String, String)> {
        match self.relay.send(Command::GetPageHtml).await? {
            CommandResponse::PageHtml { title, url, html } => Ok((title, url, html)),
            other => Err(PickError::CommandFailed {
                command: "GET_PAGE_HTML".to_string(),
                reason: format!("unexpected reply: {:?}", other),
            }),
        }
    }

    /// Fetch and cache the credit balance
    pub async fn refresh_credits(&mut self) -> Result<CreditBalance> {
        let balance = self.services.ledger.balance().await?;
        self.credits = Some(balance);
        Ok(balance)
    }

    /// Begin sign-in: validate the address, then request a one-time code
    pub async fn request_sign_in_code(&self, email: &str) -> Result<()> {
        validate_email(email)?;
        self.services.auth.request_code(email.trim()).await
    }

    /// Finish sign-in with the emailed code, then load credits
    pub async fn complete_sign_in(&mut self, email: &str, code: &str) -> Result<()> {
        let code = code.trim();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(PickError::InvalidInput("Enter the 6-digit code".to_string()));
        }
        let session = self.services.auth.verify_code(email.trim(), code).await?;
        log::info!("Signed in as {}", session.email);
        self.session = Some(session);

        // Credits are display state; failing to load them is not a sign-in failure
        if let Err(e) = self.refresh_credits().await {
            log::warn!("Failed to load credits: {}", e);
        }
        Ok(())
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        self.services.auth.sign_out().await?;
        self.session = None;
        self.credits = None;
        Ok(())
    }

    /// Ask a question about the current selection (or the whole page)
    ///
    /// Blocked without consuming a credit when the balance is exhausted.
    /// Context falls back from the selected element's HTML to the page
    /// snapshot to nothing. The structured answer is passed through
    /// unmodified; a failed call is surfaced and abandoned, never retried
    /// here.
    pub async fn ask(&mut self, question: &str) -> Result<AnswerEnvelope> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PickError::InvalidInput("Please enter a question".to_string()));
        }

        if self.credits.is_none() {
            if let Ok(balance) = self.services.ledger.balance().await {
                self.credits = Some(balance);
            }
        }
        if let Some(credits) = self.credits {
            if credits.exhausted() {
                log::info!("Query blocked: credit limit reached");
                return Err(PickError::CreditsExhausted);
            }
        }

        let html = match self.store.selected_element() {
            Some(payload) => {
                log::info!("Attaching selected <{}> element as context", payload.tag_name);
                Some(payload.outer_html_snippet)
            }
            None => match self.store.page_snapshot() {
                Some(snapshot) => {
                    log::info!("No selection; attaching full page snapshot");
                    Some(snapshot.html)
                }
                None => {
                    log::debug!("No selection and no page snapshot; asking without context");
                    None
                }
            },
        };

        let answer = self.services.qa.ask(question, html.as_deref()).await?;

        // The call succeeded; one credit is spent. A failed ledger update is
        // logged and swallowed so the answer still reaches the user.
        match self.services.ledger.record_use().await {
            Ok(balance) => self.credits = Some(balance),
            Err(e) => log::warn!("Failed to update credits: {}", e),
        }

        Ok(answer)
    }
}
