//! Errors produced by the auth and expense HTTP clients.

/// Failure talking to the Daily X backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("network request failed: {0}")]
    Network(String),

    /// The backend answered with a non-success status and no error field.
    #[error("API response error: status {status}")]
    Status { status: u16, body: String },

    /// The response body carried an `error` field, whatever the HTTP status.
    #[error("API reported error: {message}")]
    Reported { status: u16, message: String },

    /// The response body could not be deserialized into the expected shape.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// An authenticated endpoint was called with no session token.
    #[error("not signed in")]
    MissingToken,
}

impl ApiError {
    /// Whether repeating the same request later could plausibly succeed.
    ///
    /// Nothing in this crate retries on its own; callers use this to decide
    /// what to tell the user.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { status: 429 | 500..=599, .. })
    }

    pub(crate) fn network(err: &reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
