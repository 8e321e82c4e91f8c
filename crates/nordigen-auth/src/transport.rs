//! HTTP transport decoration
//!
//! Endpoint wrappers build requests from relative paths (`accounts/{id}/`).
//! The transport resolves them against the API base URL, sets the JSON
//! headers the API expects, and attaches the current bearer token read
//! from the `TokenStore`. Reading the token never waits on renewal.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use tracing::warn;

use crate::credentials::TokenStore;
use crate::error::{Error, Result};

/// Shared, cheaply cloneable request builder for the API.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Arc<str>,
    store: Arc<TokenStore>,
}

impl Transport {
    /// Build a transport with its own HTTP client.
    ///
    /// `base_url` must be an absolute http(s) URL, e.g.
    /// `https://bankaccountdata.gocardless.com/api/v2`.
    pub fn new(base_url: &str, timeout: Duration, store: Arc<TokenStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
        Self::with_client(client, base_url, store)
    }

    /// Build a transport around an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        store: Arc<TokenStore>,
    ) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::BaseUrl(format!(
                "must start with http:// or https://, got: {base_url}"
            )));
        }
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            store,
        })
    }

    /// Absolute URL for a path relative to the API base.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Authenticated request: JSON headers plus `Authorization: Bearer`.
    ///
    /// Before the first pair is installed the request goes out without a
    /// bearer header and the API answers 401.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.token_request(method, path);
        match self.store.current() {
            Some(token) => builder.bearer_auth(token),
            None => {
                warn!(path, "no access token installed, sending unauthenticated request");
                builder
            }
        }
    }

    /// Request for the token endpoints: JSON headers, no bearer token.
    pub fn token_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
    }
}
