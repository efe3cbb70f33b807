//! External collaborators: remote Q&A, credit accounting, authentication
//!
//! Each collaborator is a trait the panel depends on, with an HTTP
//! implementation behind the `remote` feature. All HTTP clients share one
//! [`RemoteConfig`]: a single base URL plus auth mode, the only endpoint
//! configuration surface in the crate.

pub mod auth;
pub mod credits;
pub mod qa;

pub use auth::{validate_email, AuthGateway, AuthSession};
pub use credits::{CreditBalance, CreditLedger};
pub use qa::{AnswerEnvelope, QaBackend};

#[cfg(feature = "remote")]
pub use auth::HttpAuthGateway;
#[cfg(feature = "remote")]
pub use credits::HttpCreditLedger;
#[cfg(feature = "remote")]
pub use qa::HttpQaClient;

/// How requests to the remote service authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// No credentials attached
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

/// Endpoint configuration shared by every remote client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub auth: AuthMode,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), auth: AuthMode::None }
    }

    /// Builder method: authenticate with a bearer token
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMode::Bearer(token.into());
        self
    }

    /// Absolute URL for a service path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    #[cfg(feature = "remote")]
    pub(crate) fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthMode::None => request,
            AuthMode::Bearer(token) => request.bearer_auth(token),
        }
    }
}
