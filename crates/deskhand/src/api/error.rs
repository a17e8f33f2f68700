//! Error type for HTTP-backed API calls.

use thiserror::Error;

/// Failure of a call to the chat completions or Arcade API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{service} API HTTP {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body was not the JSON we expected.
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The server reported an error inside a success response.
    #[error("{service} API error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },
}

impl ApiError {
    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed: rate limiting,
    /// server-side failures, and transport timeouts or connect errors.
    /// Client errors (400, 401, 403, 404, 422) are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http { status, .. } => *status == 429 || (500..=504).contains(status),
            ApiError::Transport(e) => e.is_timeout() || e.is_connect(),
            ApiError::Decode(_) | ApiError::Api { .. } => false,
        }
    }
}
