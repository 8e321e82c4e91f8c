//! Credential lifecycle state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The renewal task in `refresh.rs` performs the I/O implied by each action
//! and publishes every new state to subscribers.

/// Lifecycle of the client's credentials.
///
/// Transitions:
/// - Unauthenticated → Authenticated (initial full authentication)
/// - Authenticated → Renewing (access token half-life reached)
/// - Authenticated → ReAuthenticating (refresh token half-life reached)
/// - Renewing / ReAuthenticating → Authenticated (renewal installed)
/// - Renewing / ReAuthenticating → Stopped with error (renewal failed)
/// - any → Stopped (stop requested)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialState {
    Unauthenticated,
    Authenticated,
    Renewing,
    ReAuthenticating,
    /// Terminal. `error` is set when a renewal failure ended the task.
    Stopped { error: Option<String> },
}

impl CredentialState {
    /// Status label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            CredentialState::Unauthenticated => "unauthenticated",
            CredentialState::Authenticated => "authenticated",
            CredentialState::Renewing => "renewing",
            CredentialState::ReAuthenticating => "reauthenticating",
            CredentialState::Stopped { error: None } => "stopped",
            CredentialState::Stopped { error: Some(_) } => "failed",
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, CredentialState::Stopped { .. })
    }

    /// Error that ended the renewal task, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            CredentialState::Stopped { error } => error.as_deref(),
            _ => None,
        }
    }
}

/// Events that drive state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialEvent {
    /// Initial full authentication installed a pair
    Authenticated,
    /// The access token renewal deadline passed
    AccessDue,
    /// The full re-authentication deadline passed
    RefreshDue,
    /// Renewal or re-authentication installed a new pair
    RenewalSucceeded,
    /// Renewal, re-authentication, or initial authentication failed
    RenewalFailed(String),
    /// Stop signal or cancellation
    StopRequested,
}

/// What the renewal task should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialAction {
    /// Sleep until the next deadline
    Sleep,
    /// Call the refresh endpoint with the current refresh token
    Refresh,
    /// Authenticate from scratch with the secret id/key
    Reauthenticate,
    /// Leave the loop
    Exit,
    /// No-op
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(
    state: CredentialState,
    event: CredentialEvent,
) -> (CredentialState, CredentialAction) {
    match (state, event) {
        // --- Terminal ---
        (stopped @ CredentialState::Stopped { .. }, _) => (stopped, CredentialAction::Exit),

        // --- Stop wins from any live state ---
        (_, CredentialEvent::StopRequested) => (
            CredentialState::Stopped { error: None },
            CredentialAction::Exit,
        ),

        // --- Unauthenticated ---
        (CredentialState::Unauthenticated, CredentialEvent::Authenticated) => {
            (CredentialState::Authenticated, CredentialAction::Sleep)
        }

        // --- Authenticated ---
        (CredentialState::Authenticated, CredentialEvent::AccessDue) => {
            (CredentialState::Renewing, CredentialAction::Refresh)
        }
        (CredentialState::Authenticated, CredentialEvent::RefreshDue) => (
            CredentialState::ReAuthenticating,
            CredentialAction::Reauthenticate,
        ),

        // --- Renewing / ReAuthenticating ---
        (
            CredentialState::Renewing | CredentialState::ReAuthenticating,
            CredentialEvent::RenewalSucceeded,
        ) => (CredentialState::Authenticated, CredentialAction::Sleep),

        (
            CredentialState::Unauthenticated
            | CredentialState::Renewing
            | CredentialState::ReAuthenticating,
            CredentialEvent::RenewalFailed(error),
        ) => (
            CredentialState::Stopped { error: Some(error) },
            CredentialAction::Exit,
        ),

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, CredentialAction::None),
    }
}
