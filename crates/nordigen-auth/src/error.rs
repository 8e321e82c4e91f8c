//! Error types for token acquisition and renewal

/// Errors from the token endpoints.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The token endpoint answered with something other than 200.
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The token endpoint answered 200 with a body we could not use.
    #[error("invalid token response: {0}")]
    Decode(String),

    #[error("invalid base URL: {0}")]
    BaseUrl(String),
}

impl Error {
    /// Rejections and undecodable responses are both authentication failures.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Rejected { .. } | Error::Decode(_))
    }

    /// HTTP status reported by the token endpoint, if it answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
