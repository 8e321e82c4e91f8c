//! Background credential renewal
//!
//! One task per client. Each cycle reads the schedule from the `TokenStore`,
//! sleeps until the earlier of the two half-life deadlines (or until
//! cancelled), then either refreshes the access token or authenticates from
//! scratch. The store lock is never held while sleeping or while a renewal
//! call is in flight.
//!
//! There are no retries: the first failed renewal stops the task, publishes
//! `CredentialState::Stopped { error }`, and is returned from the join handle.
//!
//! Consecutive renewals are at least `MIN_RENEWAL_INTERVAL` apart, so a
//! provider answering with near-zero lifetimes cannot drive a refresh storm.
//! The first wake is not floored: an already expired token renews at once.

use std::sync::Arc;
use std::time::Duration;

use nordigen_auth::{CredentialPair, RenewalSchedule, TokenResponse, TokenSource, TokenStore};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::state::{CredentialAction, CredentialEvent, CredentialState, handle_event};

/// Shortest gap between the end of one renewal and the start of the next.
pub const MIN_RENEWAL_INTERVAL: Duration = Duration::from_secs(1);

/// Which renewal the next deadline calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalKind {
    /// Trade the refresh token for a new access token
    Refresh,
    /// Authenticate again with the secret id/key
    Reauthenticate,
}

impl RenewalKind {
    pub fn label(&self) -> &'static str {
        match self {
            RenewalKind::Refresh => "refresh",
            RenewalKind::Reauthenticate => "reauthenticate",
        }
    }

    fn due_event(&self) -> CredentialEvent {
        match self {
            RenewalKind::Refresh => CredentialEvent::AccessDue,
            RenewalKind::Reauthenticate => CredentialEvent::RefreshDue,
        }
    }
}

/// Time to wait from `now` and the renewal due at that point.
///
/// The wait is the distance to the earlier deadline, zero if it has already
/// passed. When the re-authentication deadline is at or before the access
/// deadline, re-authentication wins: a refresh would present a refresh token
/// that is itself due for replacement.
pub fn next_renewal(schedule: &RenewalSchedule, now: Instant) -> (Duration, RenewalKind) {
    let (deadline, kind) = if schedule.next_full_reauth_at <= schedule.next_access_renewal_at {
        (schedule.next_full_reauth_at, RenewalKind::Reauthenticate)
    } else {
        (schedule.next_access_renewal_at, RenewalKind::Refresh)
    };
    (deadline.saturating_duration_since(now), kind)
}

/// Result of a renewal call, held until we know the task was not stopped.
enum Renewed {
    Refreshed(TokenResponse),
    Reauthenticated(CredentialPair),
}

/// Spawn the renewal task.
///
/// The store must already hold a pair and `status` should read
/// `Authenticated`. Every state change is published through `status`.
/// The task ends with `Ok(())` when `shutdown` is cancelled and with an
/// error when a renewal fails.
pub fn spawn_renewal_task(
    store: Arc<TokenStore>,
    source: Arc<dyn TokenSource>,
    shutdown: CancellationToken,
    status: watch::Sender<CredentialState>,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move { run(&store, source.as_ref(), &shutdown, &status).await })
}

async fn run(
    store: &TokenStore,
    source: &dyn TokenSource,
    shutdown: &CancellationToken,
    status: &watch::Sender<CredentialState>,
) -> Result<()> {
    info!("credential renewal task started");
    if store.schedule_snapshot().is_some() && *status.borrow() == CredentialState::Unauthenticated
    {
        transition(status, CredentialEvent::Authenticated);
    }

    let mut not_before: Option<Instant> = None;

    loop {
        let Some(schedule) = store.schedule_snapshot() else {
            let msg = "no credentials installed".to_string();
            error!("renewal task started without credentials, stopping");
            transition(status, CredentialEvent::RenewalFailed(msg.clone()));
            return Err(Error::RenewalFailed(msg));
        };

        let now = Instant::now();
        let (mut wait, kind) = next_renewal(&schedule, now);
        if let Some(not_before) = not_before {
            wait = wait.max(not_before.saturating_duration_since(now));
        }
        debug!(
            wait_secs = wait.as_secs(),
            kind = kind.label(),
            "sleeping until next renewal"
        );

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("shutdown, stopping credential renewal task");
                transition(status, CredentialEvent::StopRequested);
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let action = transition(status, kind.due_event());
        let outcome = match action {
            CredentialAction::Refresh => refresh(store, source).await,
            CredentialAction::Reauthenticate => source
                .obtain()
                .await
                .map(Renewed::Reauthenticated)
                .map_err(Error::from),
            CredentialAction::Exit => return Ok(()),
            CredentialAction::Sleep | CredentialAction::None => continue,
        };

        // The call is never aborted, but its result is dropped after a stop
        if shutdown.is_cancelled() {
            info!(kind = kind.label(), "shutdown during renewal, discarding result");
            transition(status, CredentialEvent::StopRequested);
            return Ok(());
        }

        not_before = Some(Instant::now() + MIN_RENEWAL_INTERVAL);

        match outcome {
            Ok(Renewed::Refreshed(response)) => {
                store.apply_refresh(response);
                metrics::counter!("nordigen_token_renewals_total", "kind" => kind.label())
                    .increment(1);
                info!(kind = kind.label(), "credential renewal succeeded");
                transition(status, CredentialEvent::RenewalSucceeded);
            }
            Ok(Renewed::Reauthenticated(pair)) => {
                store.install(pair);
                metrics::counter!("nordigen_token_renewals_total", "kind" => kind.label())
                    .increment(1);
                info!(kind = kind.label(), "credential renewal succeeded");
                transition(status, CredentialEvent::RenewalSucceeded);
            }
            Err(e) => {
                metrics::counter!("nordigen_token_renewal_failures_total", "kind" => kind.label())
                    .increment(1);
                error!(kind = kind.label(), error = %e, "credential renewal failed, stopping");
                transition(status, CredentialEvent::RenewalFailed(e.to_string()));
                return Err(e);
            }
        }
    }
}

async fn refresh(store: &TokenStore, source: &dyn TokenSource) -> Result<Renewed> {
    let refresh = store
        .refresh_token()
        .ok_or_else(|| Error::RenewalFailed("no refresh token installed".into()))?;
    let response = source.refresh(&refresh).await?;
    Ok(Renewed::Refreshed(response))
}

/// Apply `event` to the published state and return the resulting action.
fn transition(
    status: &watch::Sender<CredentialState>,
    event: CredentialEvent,
) -> CredentialAction {
    let current = status.borrow().clone();
    let (next, action) = handle_event(current, event);
    debug!(state = next.label(), ?action, "credential state");
    status.send_replace(next);
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use nordigen_auth::BoxFuture;
    use std::sync::Mutex;

    /// Token source that records when each call happened.
    struct FakeSource {
        calls: Mutex<Vec<(RenewalKind, Instant)>>,
        new_pair: CredentialPair,
        refresh_response: TokenResponse,
        refresh_status: Option<u16>,
        delay: Duration,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                new_pair: pair("reauth", 3600, 7_776_000),
                refresh_response: TokenResponse {
                    access: "at_refreshed".into(),
                    access_expires: 3600,
                    refresh: None,
                    refresh_expires: None,
                },
                refresh_status: None,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> Vec<(RenewalKind, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TokenSource for FakeSource {
        fn obtain(&self) -> BoxFuture<'_, nordigen_auth::Result<CredentialPair>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((RenewalKind::Reauthenticate, Instant::now()));
                tokio::time::sleep(self.delay).await;
                Ok(self.new_pair.clone())
            })
        }

        fn refresh<'a>(
            &'a self,
            _refresh: &'a str,
        ) -> BoxFuture<'a, nordigen_auth::Result<TokenResponse>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push((RenewalKind::Refresh, Instant::now()));
                tokio::time::sleep(self.delay).await;
                match self.refresh_status {
                    Some(status) => Err(nordigen_auth::Error::Rejected {
                        status,
                        body: "refresh token revoked".into(),
                    }),
                    None => Ok(self.refresh_response.clone()),
                }
            })
        }
    }

    fn pair(suffix: &str, access_expires: u64, refresh_expires: u64) -> CredentialPair {
        CredentialPair {
            access: format!("at_{suffix}"),
            access_expires,
            refresh: format!("rt_{suffix}"),
            refresh_expires,
        }
    }

    struct Harness {
        store: Arc<TokenStore>,
        source: Arc<FakeSource>,
        shutdown: CancellationToken,
        status: watch::Receiver<CredentialState>,
        handle: tokio::task::JoinHandle<Result<()>>,
    }

    fn start(initial: CredentialPair, source: FakeSource) -> Harness {
        let store = Arc::new(TokenStore::new());
        store.install(initial);
        let source = Arc::new(source);
        let shutdown = CancellationToken::new();
        let (tx, status) = watch::channel(CredentialState::Authenticated);
        let handle = spawn_renewal_task(store.clone(), source.clone(), shutdown.clone(), tx);
        Harness {
            store,
            source,
            shutdown,
            status,
            handle,
        }
    }

    fn schedule_at(now: Instant, access_secs: u64, reauth_secs: u64) -> RenewalSchedule {
        RenewalSchedule {
            next_access_renewal_at: now + Duration::from_secs(access_secs),
            next_full_reauth_at: now + Duration::from_secs(reauth_secs),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn next_renewal_picks_earlier_deadline() {
        let now = Instant::now();
        assert_eq!(
            next_renewal(&schedule_at(now, 1800, 3_888_000), now),
            (Duration::from_secs(1800), RenewalKind::Refresh)
        );
        assert_eq!(
            next_renewal(&schedule_at(now, 1800, 500), now),
            (Duration::from_secs(500), RenewalKind::Reauthenticate)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn next_renewal_tie_goes_to_reauthentication() {
        let now = Instant::now();
        assert_eq!(
            next_renewal(&schedule_at(now, 60, 60), now),
            (Duration::from_secs(60), RenewalKind::Reauthenticate)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn next_renewal_clamps_past_deadlines_to_zero() {
        let schedule = schedule_at(Instant::now(), 10, 100);
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(
            next_renewal(&schedule, Instant::now()),
            (Duration::ZERO, RenewalKind::Refresh)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_wake_is_at_access_half_life() {
        let start_at = Instant::now();
        let h = start(pair("initial", 3600, 7_776_000), FakeSource::new());

        tokio::time::sleep(Duration::from_secs(1801)).await;

        let calls = h.source.calls();
        assert_eq!(calls.len(), 1, "calls: {calls:?}");
        assert_eq!(calls[0].0, RenewalKind::Refresh);
        assert_eq!(calls[0].1 - start_at, Duration::from_secs(1800));
        assert_eq!(h.store.current().as_deref(), Some("at_refreshed"));
        assert_eq!(*h.status.borrow(), CredentialState::Authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn one_refresh_per_access_deadline() {
        let h = start(pair("initial", 3600, 7_776_000), FakeSource::new());

        tokio::time::sleep(Duration::from_secs(3599)).await;
        assert_eq!(h.source.calls().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_half_life_first_triggers_reauthentication() {
        let start_at = Instant::now();
        let h = start(pair("initial", 3600, 1000), FakeSource::new());

        tokio::time::sleep(Duration::from_secs(501)).await;

        let calls = h.source.calls();
        assert_eq!(calls.len(), 1, "calls: {calls:?}");
        assert_eq!(calls[0].0, RenewalKind::Reauthenticate);
        assert_eq!(calls[0].1 - start_at, Duration::from_secs(500));
        assert_eq!(h.store.current().as_deref(), Some("at_reauth"));
        assert_eq!(h.store.refresh_token().as_deref(), Some("rt_reauth"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_access_token_refreshes_immediately_once() {
        let start_at = Instant::now();
        let h = start(pair("initial", 0, 7_776_000), FakeSource::new());

        tokio::time::sleep(Duration::from_millis(1)).await;

        let calls = h.source.calls();
        assert_eq!(calls.len(), 1, "calls: {calls:?}");
        assert!(calls[0].1 - start_at < Duration::from_millis(1));
        assert_eq!(h.store.current().as_deref(), Some("at_refreshed"));

        // Next deadline is a full half-life away
        tokio::time::sleep(Duration::from_secs(1700)).await;
        assert_eq!(h.source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_lifetime_refreshes_are_rate_limited() {
        let mut source = FakeSource::new();
        source.refresh_response.access_expires = 0;
        let h = start(pair("initial", 0, 7_776_000), source);

        tokio::time::sleep(Duration::from_millis(10_500)).await;

        let calls = h.source.calls();
        assert_eq!(calls.len(), 11, "calls: {calls:?}");
        assert!(calls.iter().all(|(kind, _)| *kind == RenewalKind::Refresh));
        for gap in calls.windows(2).map(|w| w[1].1 - w[0].1) {
            assert!(gap >= MIN_RENEWAL_INTERVAL, "gap: {gap:?}");
        }
        assert_eq!(*h.status.borrow(), CredentialState::Authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_lifetime_reauthentication_is_rate_limited() {
        let mut source = FakeSource::new();
        source.new_pair = pair("reauth", 3600, 1);
        let h = start(pair("initial", 3600, 0), source);

        tokio::time::sleep(Duration::from_millis(5_500)).await;

        let calls = h.source.calls();
        assert_eq!(calls.len(), 6, "calls: {calls:?}");
        assert!(
            calls
                .iter()
                .all(|(kind, _)| *kind == RenewalKind::Reauthenticate)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn access_only_refresh_keeps_reauth_deadline() {
        let start_at = Instant::now();
        let h = start(pair("initial", 3600, 7200), FakeSource::new());

        // Refresh at 1800, then the refresh token's half-life at 3600 wins
        // the tie with the renewed access token's half-life.
        tokio::time::sleep(Duration::from_secs(3601)).await;

        let calls = h.source.calls();
        assert_eq!(calls.len(), 2, "calls: {calls:?}");
        assert_eq!(calls[0].0, RenewalKind::Refresh);
        assert_eq!(calls[1].0, RenewalKind::Reauthenticate);
        assert_eq!(calls[1].1 - start_at, Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_deadline_makes_no_calls() {
        let h = start(pair("initial", 3600, 7_776_000), FakeSource::new());
        tokio::task::yield_now().await;

        h.shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), h.handle)
            .await
            .expect("task must stop promptly")
            .unwrap();

        assert!(result.is_ok());
        assert!(h.source.calls().is_empty());
        assert_eq!(*h.status.borrow(), CredentialState::Stopped { error: None });
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_stops_task_with_error() {
        let mut source = FakeSource::new();
        source.refresh_status = Some(401);
        let h = start(pair("initial", 0, 7_776_000), source);

        let result = h.handle.await.unwrap();
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "got: {err:?}");

        let state = h.status.borrow().clone();
        assert!(state.is_stopped());
        assert!(
            state.error().unwrap().contains("401"),
            "state: {state:?}"
        );
        // Stale token stays readable for the request path
        assert_eq!(h.store.current().as_deref(), Some("at_initial"));
        assert_eq!(h.source.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn result_arriving_after_stop_is_discarded() {
        let mut source = FakeSource::new();
        source.delay = Duration::from_secs(10);
        let h = start(pair("initial", 0, 7_776_000), source);

        // Let the refresh call start, then stop while it is in flight
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.source.calls().len(), 1);
        h.shutdown.cancel();

        let result = h.handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(h.store.current().as_deref(), Some("at_initial"));
        assert_eq!(*h.status.borrow(), CredentialState::Stopped { error: None });
    }

    #[tokio::test(start_paused = true)]
    async fn empty_store_fails_immediately() {
        let store = Arc::new(TokenStore::new());
        let shutdown = CancellationToken::new();
        let (tx, rx) = watch::channel(CredentialState::Authenticated);
        let source: Arc<dyn TokenSource> = Arc::new(FakeSource::new());

        let result = spawn_renewal_task(store, source, shutdown, tx).await.unwrap();
        assert!(matches!(result, Err(Error::RenewalFailed(_))));
        assert!(rx.borrow().is_stopped());
    }
}
