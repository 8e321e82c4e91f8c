//! Credential core for the GoCardless Bank Account Data (Nordigen) API
//!
//! Owns everything needed to keep a valid bearer token on hand:
//! 1. `token::new_token()` exchanges the long-lived secret id/key for a pair
//! 2. `credentials::TokenStore` holds the current pair and its renewal schedule
//! 3. `token::refresh_token()` mints a new access token from the refresh token
//! 4. `transport::Transport` decorates every outbound request with the API
//!    base URL, JSON headers, and the current bearer token
//!
//! The background task that drives renewals lives in `nordigen-client`.

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;
pub mod transport;

pub use constants::*;
pub use credentials::{CredentialPair, RenewalSchedule, TokenStore};
pub use error::{Error, Result};
pub use token::{
    BoxFuture, HttpTokenSource, TokenResponse, TokenSource, new_token, refresh_token,
};
pub use transport::Transport;
