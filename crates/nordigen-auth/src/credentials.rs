//! In-memory token store
//!
//! Holds the single current credential pair together with the instants each
//! token was issued. Renewal deadlines are derived from those instants at
//! half of each token's lifetime.
//!
//! A `std::sync::RwLock` guards the state. Every operation here is pure
//! memory work and the guard is never held across an `.await`, so the
//! request path can read the token synchronously while the background
//! renewal task installs replacements.

use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::token::TokenResponse;

/// Access and refresh tokens with their lifetimes in seconds, relative to
/// the moment they were issued.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: String,
    pub access_expires: u64,
    pub refresh: String,
    pub refresh_expires: u64,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"[REDACTED]")
            .field("access_expires", &self.access_expires)
            .field("refresh", &"[REDACTED]")
            .field("refresh_expires", &self.refresh_expires)
            .finish()
    }
}

/// Deadlines at which the background task should act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalSchedule {
    /// Half-life of the access token: renew it with the refresh token.
    pub next_access_renewal_at: Instant,
    /// Half-life of the refresh token: authenticate from scratch.
    pub next_full_reauth_at: Instant,
}

#[derive(Debug)]
struct Installed {
    pair: CredentialPair,
    access_issued_at: Instant,
    refresh_issued_at: Instant,
}

impl Installed {
    fn schedule(&self) -> RenewalSchedule {
        RenewalSchedule {
            next_access_renewal_at: half_life(self.access_issued_at, self.pair.access_expires),
            next_full_reauth_at: half_life(self.refresh_issued_at, self.pair.refresh_expires),
        }
    }
}

fn half_life(issued_at: Instant, lifetime_secs: u64) -> Instant {
    issued_at + Duration::from_secs(lifetime_secs / 2)
}

/// Thread-safe holder of the current credential pair.
#[derive(Debug, Default)]
pub struct TokenStore {
    state: RwLock<Option<Installed>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access token currently installed, possibly stale if renewal lags.
    ///
    /// Returns `None` only before the first successful authentication.
    pub fn current(&self) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.as_ref().map(|installed| installed.pair.access.clone())
    }

    /// Refresh token currently installed.
    pub fn refresh_token(&self) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.as_ref().map(|installed| installed.pair.refresh.clone())
    }

    /// Copy of the installed pair, mainly for diagnostics and tests.
    pub fn pair(&self) -> Option<CredentialPair> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.as_ref().map(|installed| installed.pair.clone())
    }

    pub fn schedule_snapshot(&self) -> Option<RenewalSchedule> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.as_ref().map(Installed::schedule)
    }

    /// Replace both tokens and restart both clocks at `now`.
    pub fn install(&self, pair: CredentialPair) {
        let now = Instant::now();
        let installed = Installed {
            pair,
            access_issued_at: now,
            refresh_issued_at: now,
        };
        let schedule = installed.schedule();
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(installed);
        info!(
            access_renewal_in_secs = (schedule.next_access_renewal_at - now).as_secs(),
            full_reauth_in_secs = (schedule.next_full_reauth_at - now).as_secs(),
            "installed credential pair"
        );
    }

    /// Replace only the access token, keeping the refresh token and the
    /// instant it was issued.
    ///
    /// Does nothing if no pair has been installed yet: there is no refresh
    /// token to keep.
    pub fn renew_access(&self, access: String, access_expires: u64) -> bool {
        let now = Instant::now();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(installed) = state.as_mut() else {
            debug!("renew_access called before any pair was installed");
            return false;
        };
        installed.pair.access = access;
        installed.pair.access_expires = access_expires;
        installed.access_issued_at = now;
        let schedule = installed.schedule();
        drop(state);

        info!(
            access_renewal_in_secs = (schedule.next_access_renewal_at - now).as_secs(),
            "renewed access token"
        );
        true
    }

    /// Install the result of a refresh call.
    ///
    /// A response that carries both `refresh` and `refresh_expires` rotates
    /// the refresh token and restarts its clock. Anything less only renews
    /// the access token.
    pub fn apply_refresh(&self, response: TokenResponse) -> bool {
        match (response.refresh, response.refresh_expires) {
            (Some(refresh), Some(refresh_expires)) => {
                self.install(CredentialPair {
                    access: response.access,
                    access_expires: response.access_expires,
                    refresh,
                    refresh_expires,
                });
                true
            }
            _ => self.renew_access(response.access, response.access_expires),
        }
    }
}
