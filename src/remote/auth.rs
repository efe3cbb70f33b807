//! One-time-passcode authentication
//!
//! The auth service is an external collaborator; only the request/response
//! contract lives here. A sign-in is two calls: request a code for an email,
//! then verify the code the user received. Input validation happens before
//! any call so malformed input surfaces as a transient user error, never as
//! a remote failure.

use crate::error::{PickError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An authenticated session returned by code verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
}

/// The authentication service
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Email a one-time code to the address
    async fn request_code(&self, email: &str) -> Result<()>;

    /// Exchange email + code for a session
    async fn verify_code(&self, email: &str, code: &str) -> Result<AuthSession>;

    /// Invalidate the current session
    async fn sign_out(&self) -> Result<()>;
}

/// Reject obviously malformed email addresses before any remote call
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PickError::InvalidInput("Please enter a valid email address".to_string()))
    }
}

#[cfg(feature = "remote")]
pub use http::HttpAuthGateway;

#[cfg(feature = "remote")]
mod http {
    use super::*;
    use crate::remote::RemoteConfig;

    #[derive(Serialize)]
    struct CodeRequest<'a> {
        email: &'a str,
    }

    #[derive(Serialize)]
    struct VerifyRequest<'a> {
        email: &'a str,
        token: &'a str,
    }

    /// HTTP client for the auth endpoints
    /// (`POST {base}/auth/otp`, `POST {base}/auth/verify`, `POST {base}/auth/signout`)
    pub struct HttpAuthGateway {
        http: reqwest::Client,
        config: RemoteConfig,
    }

    impl HttpAuthGateway {
        pub fn new(config: RemoteConfig) -> Self {
            Self { http: reqwest::Client::new(), config }
        }

        async fn post(&self, path: &str, body: &impl Serialize) -> Result<reqwest::Response> {
            let response = self
                .config
                .apply_auth(self.http.post(self.config.endpoint(path)))
                .json(body)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(PickError::AuthFailed(format!("{}: {}", status.as_u16(), body)));
            }
            Ok(response)
        }
    }

    #[async_trait]
    impl AuthGateway for HttpAuthGateway {
        async fn request_code(&self, email: &str) -> Result<()> {
            validate_email(email)?;
            self.post("auth/otp", &CodeRequest { email }).await?;
            Ok(())
        }

        async fn verify_code(&self, email: &str, code: &str) -> Result<AuthSession> {
            let response = self.post("auth/verify", &VerifyRequest { email, token: code }).await?;
            Ok(response.json().await?)
        }

        async fn sign_out(&self) -> Result<()> {
            self.post("auth/signout", &serde_json::json!({})).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("  user.name+tag@sub.example.com  ").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        for bad in ["", "plain", "@example.com", "a@", "a@nodot", "a b@example.com", "a@.com"] {
            let err = validate_email(bad).unwrap_err();
            assert!(matches!(err, PickError::InvalidInput(_)), "{} should be invalid", bad);
        }
    }
}
