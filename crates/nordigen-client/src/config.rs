//! Client construction settings

use std::time::Duration;

use common::Secret;
use nordigen_auth::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Long-lived secrets plus transport settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub secret_id: Secret<String>,
    pub secret_key: Secret<String>,
    /// API base, e.g. `https://bankaccountdata.gocardless.com/api/v2`
    pub base_url: String,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config against the production API with the default timeout.
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: Secret::new(secret_id.into()),
            secret_key: Secret::new(secret_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_production() {
        let config = ClientConfig::new("id", "key");
        assert_eq!(config.base_url, "https://bankaccountdata.gocardless.com/api/v2");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn debug_hides_secrets() {
        let config = ClientConfig::new("my-secret-id", "my-secret-key")
            .with_base_url("http://127.0.0.1:9000/api/v2")
            .with_timeout(Duration::from_secs(5));
        let debug = format!("{config:?}");
        assert!(!debug.contains("my-secret-id"), "got: {debug}");
        assert!(!debug.contains("my-secret-key"), "got: {debug}");
        assert!(debug.contains("127.0.0.1:9000"));
    }
}
