//! The remote question-answering call
//!
//! Opaque from the crate's perspective: send a question plus HTML context,
//! get back a structured JSON answer or an error string. Results are passed
//! through to the caller unmodified; failed calls are abandoned, never
//! retried automatically.

use crate::error::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The structured answer shape the remote service speaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnswerEnvelope {
    /// Interpret a raw remote response body
    ///
    /// Envelope-shaped JSON is taken as-is; other valid JSON becomes the
    /// `data` of a successful envelope; non-JSON text is wrapped so callers
    /// always see one shape.
    pub fn from_raw(raw: &str) -> Self {
        if let Ok(envelope) = serde_json::from_str::<AnswerEnvelope>(raw) {
            return envelope;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self { success: true, data: value, message: None },
            Err(_) => {
                log::warn!("Remote response was not valid JSON, wrapping it");
                Self {
                    success: true,
                    data: Value::String(raw.to_string()),
                    message: Some("Response wrapped in JSON".to_string()),
                }
            }
        }
    }
}

/// The remote Q&A service
#[async_trait]
pub trait QaBackend: Send + Sync {
    /// Ask a question, optionally with HTML context attached
    async fn ask(&self, question: &str, html: Option<&str>) -> Result<AnswerEnvelope>;
}

#[cfg(feature = "remote")]
pub use http::HttpQaClient;

#[cfg(feature = "remote")]
mod http {
    use super::*;
    use crate::error::PickError;
    use crate::remote::RemoteConfig;

    #[derive(Serialize)]
    struct AskRequest<'a> {
        question: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        html: Option<&'a str>,
    }

    /// HTTP client for the Q&A endpoint (`POST {base}/ask`)
    pub struct HttpQaClient {
        http: reqwest::Client,
        config: RemoteConfig,
    }

    impl HttpQaClient {
        pub fn new(config: RemoteConfig) -> Self {
            Self { http: reqwest::Client::new(), config }
        }
    }

    #[async_trait]
    impl QaBackend for HttpQaClient {
        async fn ask(&self, question: &str, html: Option<&str>) -> Result<AnswerEnvelope> {
            let request = self
                .config
                .apply_auth(self.http.post(self.config.endpoint("ask")))
                .json(&AskRequest { question, html });

            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(PickError::RemoteFailed(format!(
                    "API error {}: {}",
                    status.as_u16(),
                    body
                )));
            }
            Ok(AnswerEnvelope::from_raw(&body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_passthrough() {
        let raw = r#"{"success": true, "data": {"price": "$19.99"}, "message": "ok"}"#;
        let envelope = AnswerEnvelope::from_raw(raw);
        assert!(envelope.success);
        assert_eq!(envelope.data, json!({"price": "$19.99"}));
        assert_eq!(envelope.message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_failure_envelope_passthrough() {
        let raw = r#"{"success": false, "data": null, "message": "cannot extract"}"#;
        let envelope = AnswerEnvelope::from_raw(raw);
        assert!(!envelope.success);
        assert_eq!(envelope.data, Value::Null);
    }

    #[test]
    fn test_plain_json_becomes_data() {
        let envelope = AnswerEnvelope::from_raw(r#"[1, 2, 3]"#);
        assert!(envelope.success);
        assert_eq!(envelope.data, json!([1, 2, 3]));
        assert!(envelope.message.is_none());
    }

    #[test]
    fn test_non_json_is_wrapped() {
        let envelope = AnswerEnvelope::from_raw("The price is $19.99");
        assert!(envelope.success);
        assert_eq!(envelope.data, Value::String("The price is $19.99".to_string()));
        assert_eq!(envelope.message.as_deref(), Some("Response wrapped in JSON"));
    }
}
