//! Client facade
//!
//! A `Client` owns one credential set: its `TokenStore`, the transport that
//! reads from it, and the renewal task that writes to it. Each instance is
//! independent. Dropping a client cancels its renewal task.

use std::sync::Arc;

use nordigen_auth::{HttpTokenSource, TokenSource, TokenStore, Transport};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::refresh::spawn_renewal_task;
use crate::state::{CredentialEvent, CredentialState, handle_event};

pub struct Client {
    transport: Transport,
    shutdown: CancellationToken,
    status: watch::Receiver<CredentialState>,
    renewal: Option<JoinHandle<Result<()>>>,
}

impl Client {
    /// Authenticate with the configured secrets and start background renewal.
    ///
    /// Initial authentication errors are returned here; later renewal errors
    /// surface through `state()`, `subscribe()` and `shutdown()`.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        Self::with_cancellation(config, &CancellationToken::new()).await
    }

    /// Like `new`, but the renewal task also stops when `parent` is cancelled.
    pub async fn with_cancellation(
        config: ClientConfig,
        parent: &CancellationToken,
    ) -> Result<Self> {
        let store = Arc::new(TokenStore::new());
        let transport = Transport::new(&config.base_url, config.timeout, store)?;
        let source = Arc::new(HttpTokenSource::new(
            transport.clone(),
            config.secret_id,
            config.secret_key,
        ));
        Self::with_token_source(transport, source, parent).await
    }

    /// Build a client around an existing transport and token source.
    pub async fn with_token_source(
        transport: Transport,
        source: Arc<dyn TokenSource>,
        parent: &CancellationToken,
    ) -> Result<Self> {
        let pair = source.obtain().await.map_err(|e| {
            error!(error = %e, "initial authentication failed");
            Error::Auth(e)
        })?;
        let store = transport.store().clone();
        store.install(pair);

        let (state, _) = handle_event(
            CredentialState::Unauthenticated,
            CredentialEvent::Authenticated,
        );
        let (tx, status) = watch::channel(state);

        let shutdown = parent.child_token();
        let renewal = spawn_renewal_task(store, source, shutdown.clone(), tx);
        info!("client authenticated, credential renewal running");

        Ok(Self {
            transport,
            shutdown,
            status,
            renewal: Some(renewal),
        })
    }

    /// Access token to attach to an outgoing request. Never waits on renewal.
    pub fn bearer(&self) -> Option<String> {
        self.transport.store().current()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn state(&self) -> CredentialState {
        self.status.borrow().clone()
    }

    /// Receiver that observes every credential state change, including the
    /// terminal `Stopped { error }` a supervisor should react to.
    pub fn subscribe(&self) -> watch::Receiver<CredentialState> {
        self.status.clone()
    }

    /// Ask the renewal task to stop. Idempotent. A renewal call already in
    /// flight runs to completion and its result is discarded.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Stop renewal and wait for the task to exit.
    ///
    /// Returns the error that ended the task if renewal had already failed.
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown.cancel();
        let Some(renewal) = self.renewal.take() else {
            return Ok(());
        };
        match renewal.await {
            Ok(result) => result,
            Err(e) => Err(Error::RenewalFailed(format!("renewal task aborted: {e}"))),
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut request = self.transport.request(Method::GET, path);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {path}: {e}")))?;
        decode(response, StatusCode::OK).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        expected: StatusCode,
    ) -> Result<T> {
        let response = self
            .transport
            .request(Method::POST, path)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("POST {path}: {e}")))?;
        decode(response, expected).await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading response body: {e}")))?;

    if status != expected {
        debug!(
            status = status.as_u16(),
            expected = expected.as_u16(),
            "unexpected API status"
        );
        return Err(Error::Api {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
}
