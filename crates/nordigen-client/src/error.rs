//! Error types for client operations

/// Errors from client construction and endpoint calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Token acquisition or renewal failed.
    #[error("authentication failed: {0}")]
    Auth(#[from] nordigen_auth::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The API answered with an unexpected status. A 401 here usually means
    /// the request raced a token renewal and can be retried once.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    /// The renewal task ended with an unrecoverable error.
    #[error("credential renewal stopped: {0}")]
    RenewalFailed(String),
}

impl Error {
    /// True when the API rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401, .. })
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
