//! Token endpoint calls
//!
//! Two interactions, both JSON POSTs against the API base:
//! 1. `token/new/` exchanges the secret id/key for an access/refresh pair
//! 2. `token/refresh/` trades the refresh token for a new access token
//!
//! Only HTTP 200 counts as success. The response status and body of any
//! other answer are kept in `Error::Rejected` for diagnostics.

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{TOKEN_NEW_PATH, TOKEN_REFRESH_PATH};
use crate::credentials::CredentialPair;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Boxed future used by `TokenSource` so it stays dyn-compatible.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Body returned by both token endpoints.
///
/// Lifetimes are seconds from issuance. `token/new/` always carries the
/// refresh pair; `token/refresh/` may omit it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access: String,
    pub access_expires: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires: Option<u64>,
}

impl TokenResponse {
    /// Convert a full-authentication response into a credential pair.
    pub fn into_pair(self) -> Result<CredentialPair> {
        match (self.refresh, self.refresh_expires) {
            (Some(refresh), Some(refresh_expires)) => Ok(CredentialPair {
                access: self.access,
                access_expires: self.access_expires,
                refresh,
                refresh_expires,
            }),
            _ => Err(Error::Decode(
                "new token response is missing refresh or refresh_expires".into(),
            )),
        }
    }
}

#[derive(Serialize)]
struct NewTokenRequest<'a> {
    secret_id: &'a str,
    secret_key: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Authenticate from scratch with the long-lived secret id/key.
pub async fn new_token(
    transport: &Transport,
    secret_id: &str,
    secret_key: &str,
) -> Result<CredentialPair> {
    let response = transport
        .token_request(Method::POST, TOKEN_NEW_PATH)
        .json(&NewTokenRequest {
            secret_id,
            secret_key,
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("new token request failed: {e}")))?;

    let token = decode(response).await?;
    debug!(access_expires = token.access_expires, "obtained new token pair");
    token.into_pair()
}

/// Mint a new access token from a refresh token.
pub async fn refresh_token(transport: &Transport, refresh: &str) -> Result<TokenResponse> {
    let response = transport
        .token_request(Method::POST, TOKEN_REFRESH_PATH)
        .json(&RefreshRequest { refresh })
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let token = decode(response).await?;
    debug!(
        access_expires = token.access_expires,
        rotated = token.refresh.is_some(),
        "refreshed access token"
    );
    Ok(token)
}

async fn decode(response: reqwest::Response) -> Result<TokenResponse> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading token response: {e}")))?;

    if status != reqwest::StatusCode::OK {
        return Err(Error::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
}

/// Where fresh credentials come from.
///
/// The renewal task only talks to this trait, so it can be driven by a fake
/// under paused time in tests.
pub trait TokenSource: Send + Sync {
    /// Full authentication with the long-lived secrets.
    fn obtain(&self) -> BoxFuture<'_, Result<CredentialPair>>;

    /// Lightweight renewal with the current refresh token.
    fn refresh<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, Result<TokenResponse>>;
}

/// `TokenSource` backed by the real token endpoints.
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    transport: Transport,
    secret_id: Secret<String>,
    secret_key: Secret<String>,
}

impl HttpTokenSource {
    pub fn new(
        transport: Transport,
        secret_id: Secret<String>,
        secret_key: Secret<String>,
    ) -> Self {
        Self {
            transport,
            secret_id,
            secret_key,
        }
    }
}

impl TokenSource for HttpTokenSource {
    fn obtain(&self) -> BoxFuture<'_, Result<CredentialPair>> {
        Box::pin(new_token(
            &self.transport,
            self.secret_id.expose(),
            self.secret_key.expose(),
        ))
    }

    fn refresh<'a>(&'a self, refresh: &'a str) -> BoxFuture<'a, Result<TokenResponse>> {
        Box::pin(refresh_token(&self.transport, refresh))
    }
}
