//! Provider error types for switchboard-llm.
//!
//! All provider operations return [`Result<T>`] which uses [`ProviderError`]
//! as the error type. Whether an error may trigger failover is decided by
//! [`crate::classify`] from the rendered message, never from the variant.

use thiserror::Error;

/// Errors that can occur when interacting with an LLM provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not be issued or the body could not be read
    /// (DNS, connect, reset, TLS).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The provider answered with a non-2xx status. The body is kept for
    /// diagnostics.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Numeric HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The provider reported an error inside an otherwise valid stream or
    /// response payload.
    #[error("provider error: {0}")]
    Vendor(String),

    /// The provider is missing a credential, endpoint, or is disabled.
    #[error("provider not ready: {0}")]
    NotReady(String),

    /// No ready provider is available to run the operation.
    #[error("no ready providers available")]
    NoProviders,

    /// The provider does not implement the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The provider returned a response that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The caller cancelled the operation.
    #[error("cancelled")]
    Cancelled,

    /// A JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest hides the interesting part (os error, dns failure) in the
        // source chain, and classification only sees the rendered text.
        let detail = error_chain(&err);
        if err.is_timeout() {
            ProviderError::Timeout(detail)
        } else {
            ProviderError::RequestFailed(detail)
        }
    }
}

impl ProviderError {
    /// A copy of this error for a second recipient.
    ///
    /// JSON errors cannot be cloned and come back as
    /// [`ProviderError::InvalidResponse`] with the same message.
    pub(crate) fn replicate(&self) -> Self {
        match self {
            Self::RequestFailed(m) => Self::RequestFailed(m.clone()),
            Self::HttpStatus { status, body } => Self::HttpStatus {
                status: *status,
                body: body.clone(),
            },
            Self::Vendor(m) => Self::Vendor(m.clone()),
            Self::NotReady(m) => Self::NotReady(m.clone()),
            Self::NoProviders => Self::NoProviders,
            Self::Unsupported(m) => Self::Unsupported(m.clone()),
            Self::InvalidResponse(m) => Self::InvalidResponse(m.clone()),
            Self::Config(m) => Self::Config(m.clone()),
            Self::Timeout(m) => Self::Timeout(m.clone()),
            Self::Cancelled => Self::Cancelled,
            Self::Json(e) => Self::InvalidResponse(e.to_string()),
        }
    }
}

/// Render an error together with every `source()` below it.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}

/// A convenience type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
