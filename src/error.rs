use thiserror::Error;

/// Errors that can occur while picking, serializing, or relaying elements
#[derive(Debug, Error)]
pub enum PickError {
    /// Failed to parse a document dump into a page document
    #[error("Failed to parse document: {0}")]
    DomParseFailed(String),

    /// A node handle did not resolve inside its document
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The page context is gone (tab navigated away or was never attached)
    #[error("Page context unavailable: {0}")]
    PageUnavailable(String),

    /// The relay task is not running or its channel is closed
    #[error("Relay unavailable: {0}")]
    RelayUnavailable(String),

    /// A relay command failed on the receiving side
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// Reading or writing the shared store failed
    #[error("Store operation failed: {0}")]
    StoreFailed(String),

    /// A remote service call failed (Q&A, credits)
    #[error("Remote request failed: {0}")]
    RemoteFailed(String),

    /// Authentication with the remote service failed
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// User-supplied input was rejected before any remote call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The credit limit is reached; the query was blocked without consuming a credit
    #[error("Credit limit reached")]
    CreditsExhausted,

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error from the remote clients
    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for dompick operations
pub type Result<T> = std::result::Result<T, PickError>;
