//! Per-user credit accounting
//!
//! The service owns the numbers; the crate only reads the pair and records
//! one use after each successful Q&A call. The exhaustion check
//! (`credits_used >= credits_remaining`) happens before a query is sent, so
//! a blocked attempt never consumes a credit.

use crate::error::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The credit pair reported per authenticated identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreditBalance {
    pub credits_used: u32,
    pub credits_remaining: u32,
}

impl CreditBalance {
    pub fn new(credits_used: u32, credits_remaining: u32) -> Self {
        Self { credits_used, credits_remaining }
    }

    /// Whether a new query must be blocked
    pub fn exhausted(&self) -> bool {
        self.credits_used >= self.credits_remaining
    }
}

/// The credit accounting service
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance for the authenticated identity
    async fn balance(&self) -> Result<CreditBalance>;

    /// Record exactly one use and return the updated balance
    async fn record_use(&self) -> Result<CreditBalance>;
}

#[cfg(feature = "remote")]
pub use http::HttpCreditLedger;

#[cfg(feature = "remote")]
mod http {
    use super::*;
    use crate::error::PickError;
    use crate::remote::RemoteConfig;

    /// HTTP client for the credits endpoints
    /// (`GET {base}/credits`, `POST {base}/credits/use`)
    pub struct HttpCreditLedger {
        http: reqwest::Client,
        config: RemoteConfig,
    }

    impl HttpCreditLedger {
        pub fn new(config: RemoteConfig) -> Self {
            Self { http: reqwest::Client::new(), config }
        }

        async fn fetch(&self, request: reqwest::RequestBuilder) -> Result<CreditBalance> {
            let response = self.config.apply_auth(request).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(PickError::RemoteFailed(format!(
                    "Credits error {}: {}",
                    status.as_u16(),
                    body
                )));
            }
            Ok(response.json().await?)
        }
    }

    #[async_trait]
    impl CreditLedger for HttpCreditLedger {
        async fn balance(&self) -> Result<CreditBalance> {
            self.fetch(self.http.get(self.config.endpoint("credits"))).await
        }

        async fn record_use(&self) -> Result<CreditBalance> {
            self.fetch(self.http.post(self.config.endpoint("credits/use"))).await
        }
    }
}
