//! Error types for talking to the exchange API.
//!
//! Every failure the client can observe collapses into [`ApiError`]. The type
//! is `Clone` so a single lookup result can be handed to every task waiting on
//! it (see [`crate::core::resolver`]).

use thiserror::Error;

/// Result type alias for API-facing operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a usable response: connection refused,
    /// timeout, or a body that could not be decoded.
    #[error("Network error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body, or the canonical reason when the body is empty
        message: String,
    },

    /// A client-side guard refused the operation before anything was sent.
    #[error("{0}")]
    Precondition(String),

    /// The operation needs a signed-in user and the session is empty.
    #[error("Not signed in")]
    NotSignedIn,
}

impl ApiError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition(reason.into())
    }

    /// Server-side rejection of the request contents (4xx).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Server { status, .. } if (400..500).contains(status))
    }

    /// True when the failure happened before any request was dispatched.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_) | Self::NotSignedIn)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Server {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        if err.is_decode() {
            return Self::Transport(format!("malformed response body: {err}"));
        }
        Self::Transport(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::Transport(format!("invalid request URL: {err}"))
    }
}
