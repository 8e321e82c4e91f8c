//! Client for the GoCardless Bank Account Data (Nordigen) API
//!
//! `Client::new()` authenticates once with the secret id/key, installs the
//! resulting pair in a `TokenStore`, and spawns a renewal task that keeps the
//! pair fresh for as long as the client lives:
//!
//! 1. Access token reaches half of its lifetime → refresh with the refresh token
//! 2. Refresh token reaches half of its lifetime → authenticate from scratch
//! 3. Any renewal failure stops the task and is surfaced through `state()`,
//!    `subscribe()`, and `shutdown()`
//!
//! Endpoint wrappers (accounts, institutions, agreements, requisitions) read
//! the current token on every call and never wait for renewal.

pub mod accounts;
pub mod agreements;
pub mod client;
pub mod config;
pub mod error;
pub mod institutions;
pub mod refresh;
pub mod requisitions;
pub mod state;

pub use accounts::{
    AccountBalances, AccountDetails, AccountMetadata, AccountTransactions, Transaction,
};
pub use agreements::EndUserAgreement;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use institutions::Institution;
pub use nordigen_auth::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use refresh::{MIN_RENEWAL_INTERVAL, RenewalKind, next_renewal, spawn_renewal_task};
pub use requisitions::{
    Requisition, RequisitionLinkRequest, RequisitionLinkResponse, RequisitionPage,
};
pub use state::{CredentialAction, CredentialEvent, CredentialState, handle_event};
