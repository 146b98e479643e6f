//! Polling controller
//!
//! Drives a project's upgrade job from the client side:
//! - Polls the status endpoint on mount and every five seconds
//! - Maps each response onto [`UpgradeState`]
//! - Requests a session refresh once a known job disappears (completion)
//! - Submits the upgrade command with the locally stored private key
//!
//! The poller is a spawned task that is aborted on unmount, on drop, when
//! the gate closes, and once a refresh has been requested.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::gate::{GateContext, UpgradeGate};
use crate::ports::{CredentialProvider, Notification, Notifier, SessionRefresher, UpgradeApi};
use crate::state::{InFlight, UpgradeState};
use crate::types::{MountId, Project, ProjectId, Role, UpgradeRequest};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::Instrument;

/// Fixed polling cadence
pub const POLL_INTERVAL: Duration = Duration::from_millis(5_000);

/// Collaborators injected into the controller
#[derive(Clone)]
pub struct ControllerDeps {
    pub api: Arc<dyn UpgradeApi>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub refresher: Arc<dyn SessionRefresher>,
}

impl std::fmt::Debug for ControllerDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerDeps").finish_non_exhaustive()
    }
}

/// What a status query did to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Gate closed; nothing was sent
    Skipped,
    /// Response discarded: unmounted, context changed, or refresh already requested
    Ignored,
    /// Response applied
    Applied {
        from: UpgradeState,
        to: UpgradeState,
    },
}

impl StatusOutcome {
    /// Whether this response triggered the session refresh
    #[inline]
    #[must_use]
    pub fn requested_refresh(&self) -> bool {
        matches!(
            self,
            StatusOutcome::Applied {
                from,
                to: UpgradeState::ReloadPending,
            } if *from != UpgradeState::ReloadPending
        )
    }
}

/// Read-only view published to subscribers on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    /// Gate open: the upgrade control should be rendered
    pub visible: bool,
    pub state: UpgradeState,
    pub message: Option<&'static str>,
    /// Upgrade control shows a spinner and is disabled
    pub loading: bool,
    /// Last failed status query, cleared by the next successful one
    pub last_error: Option<String>,
    pub last_status_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryOrigin {
    Initial,
    Timer,
    Manual,
}

struct Shared {
    context: GateContext,
    state: UpgradeState,
    in_flight: InFlight,
    mounted: bool,
    poller: Option<AbortHandle>,
    last_error: Option<String>,
    last_status_at: Option<DateTime<Utc>>,
}

impl Shared {
    fn stop_poller(&mut self) -> bool {
        self.in_flight.initial_fetch = false;
        match self.poller.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

struct Inner {
    mount_id: MountId,
    gate: UpgradeGate,
    deps: ControllerDeps,
    shared: Mutex<Shared>,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
}

impl Inner {
    fn snapshot_of(&self, shared: &Shared) -> ControllerSnapshot {
        ControllerSnapshot {
            visible: self.gate.evaluate(&shared.context).is_open(),
            state: shared.state,
            message: shared.state.message(),
            loading: shared.state.is_loading(shared.in_flight),
            last_error: shared.last_error.clone(),
            last_status_at: shared.last_status_at,
        }
    }

    fn publish(&self, shared: &Shared) {
        self.snapshot_tx.send_replace(self.snapshot_of(shared));
    }

    /// Spawn the poller if mounted, allowed, and not already running
    fn ensure_polling(self: &Arc<Self>, shared: &mut Shared) -> bool {
        if !shared.mounted
            || shared.poller.is_some()
            || !shared.state.accepts_status()
            || !self.gate.allows_polling(&shared.context)
        {
            return false;
        }

        if shared.state == UpgradeState::Idle {
            shared.state = UpgradeState::Polling;
        }
        shared.in_flight.initial_fetch = true;

        let span = tracing::info_span!(
            "upgrade_poller",
            mount_id = %self.mount_id,
            project_id = %shared.context.project.id,
        );
        let handle = tokio::spawn(Arc::clone(self).poll_loop().instrument(span));
        shared.poller = Some(handle.abort_handle());
        true
    }

    async fn poll_loop(self: Arc<Self>) {
        tracing::info!("status polling started");
        let mounted_at = Instant::now();

        // The timer runs from mount, whatever the first query takes.
        let ticks = async {
            let mut ticker = interval_at(mounted_at + POLL_INTERVAL, POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !self.should_poll() {
                    tracing::debug!("entry condition no longer holds; poller exiting");
                    break;
                }
                self.poll_once(QueryOrigin::Timer).await;
            }
        };

        tokio::join!(self.poll_once(QueryOrigin::Initial), ticks);
    }

    fn should_poll(&self) -> bool {
        let shared = self.shared.lock();
        shared.mounted && shared.state.accepts_status() && self.gate.allows_polling(&shared.context)
    }

    async fn poll_once(self: &Arc<Self>, origin: QueryOrigin) {
        if let Err(err) = self.query_and_apply(origin).await {
            tracing::warn!(?origin, error = %err, "status query failed");
        }
    }

    async fn query_and_apply(
        self: &Arc<Self>,
        origin: QueryOrigin,
    ) -> OrchestratorResult<StatusOutcome> {
        let project_id = {
            let shared = self.shared.lock();
            if !shared.mounted || !shared.state.accepts_status() {
                return Ok(StatusOutcome::Ignored);
            }
            if !self.gate.allows_polling(&shared.context) {
                tracing::debug!(mount_id = %self.mount_id, "gate closed; status query skipped");
                return Ok(StatusOutcome::Skipped);
            }
            shared.context.project.id.clone()
        };

        let result = self.deps.api.upgrade_status(&project_id).await;

        let (outcome, refresh) = {
            let mut shared = self.shared.lock();
            if origin == QueryOrigin::Initial {
                shared.in_flight.initial_fetch = false;
            }

            if !shared.mounted || shared.context.project.id != project_id {
                self.publish(&shared);
                return Ok(StatusOutcome::Ignored);
            }
            if !self.gate.allows_polling(&shared.context) {
                tracing::debug!(
                    mount_id = %self.mount_id,
                    ?origin,
                    "gate closed while querying; response dropped"
                );
                self.publish(&shared);
                return Ok(StatusOutcome::Ignored);
            }

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    shared.last_error = Some(err.to_string());
                    self.publish(&shared);
                    return Err(err.into());
                }
            };

            if !shared.state.accepts_status() {
                return Ok(StatusOutcome::Ignored);
            }

            let from = shared.state;
            let to = from.on_status(response.status);
            shared.state = to;
            shared.last_error = None;
            shared.last_status_at = Some(Utc::now());

            let outcome = StatusOutcome::Applied { from, to };
            let refresh = outcome.requested_refresh();
            if refresh {
                shared.stop_poller();
            }
            if from != to {
                tracing::info!(
                    mount_id = %self.mount_id,
                    project_id = %project_id,
                    %from,
                    %to,
                    "upgrade state changed"
                );
            }
            self.publish(&shared);
            (outcome, refresh)
        };

        if refresh {
            tracing::info!(mount_id = %self.mount_id, project_id = %project_id, "upgrade completed; refreshing session");
            self.deps.refresher.refresh();
        }

        Ok(outcome)
    }
}

/// Client-side driver of one project's upgrade job
///
/// Dropping the controller unmounts it.
pub struct PollingController {
    inner: Arc<Inner>,
}

impl PollingController {
    /// Create an unmounted controller
    #[must_use]
    pub fn new(gate: UpgradeGate, project: Project, role: Role, deps: ControllerDeps) -> Self {
        let shared = Shared {
            context: GateContext::new(project, role),
            state: UpgradeState::Idle,
            in_flight: InFlight::default(),
            mounted: false,
            poller: None,
            last_error: None,
            last_status_at: None,
        };
        let mount_id = MountId::new();
        let initial = ControllerSnapshot {
            visible: gate.evaluate(&shared.context).is_open(),
            state: shared.state,
            message: None,
            loading: false,
            last_error: None,
            last_status_at: None,
        };
        let (snapshot_tx, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                mount_id,
                gate,
                deps,
                shared: Mutex::new(shared),
                snapshot_tx,
            }),
        }
    }

    /// Mount the controller; starts polling if the gate is open
    ///
    /// Must be called from within a tokio runtime. Returns whether polling
    /// started.
    pub fn mount(&self) -> bool {
        let mut shared = self.inner.shared.lock();
        if shared.mounted {
            return shared.poller.is_some();
        }
        shared.mounted = true;
        let started = self.inner.ensure_polling(&mut shared);
        if !started {
            tracing::debug!(
                mount_id = %self.inner.mount_id,
                decision = ?self.inner.gate.evaluate(&shared.context),
                "mounted without polling"
            );
        }
        self.inner.publish(&shared);
        started
    }

    /// Unmount: stop the poller and ignore any response still in flight
    pub fn unmount(&self) {
        let mut shared = self.inner.shared.lock();
        if !shared.mounted {
            return;
        }
        shared.mounted = false;
        shared.in_flight = InFlight::default();
        if shared.stop_poller() {
            tracing::info!(mount_id = %self.inner.mount_id, "status polling stopped on unmount");
        }
        self.inner.publish(&shared);
    }

    /// Replace the project and role the gate is evaluated against
    ///
    /// Polling stops when the gate closes and restarts, with a fresh
    /// immediate query, when it opens again. Switching to another project
    /// resets the observed state.
    pub fn set_context(&self, project: Project, role: Role) {
        let mut shared = self.inner.shared.lock();
        let context = GateContext::new(project, role);
        if shared.context == context {
            return;
        }

        if shared.context.project.id != context.project.id {
            shared.stop_poller();
            shared.state = UpgradeState::Idle;
            shared.last_error = None;
            shared.last_status_at = None;
        }
        shared.context = context;

        if self.inner.gate.allows_polling(&shared.context) {
            self.inner.ensure_polling(&mut shared);
        } else if shared.stop_poller() {
            tracing::info!(
                mount_id = %self.inner.mount_id,
                decision = ?self.inner.gate.evaluate(&shared.context),
                "entry condition lost; status polling stopped"
            );
        }
        self.inner.publish(&shared);
    }

    /// Query the status now, outside the timer cadence
    ///
    /// # Errors
    /// Transport failures are returned unchanged.
    pub async fn refresh_status(&self) -> OrchestratorResult<StatusOutcome> {
        self.inner.query_and_apply(QueryOrigin::Manual).await
    }

    /// Submit the upgrade job, then query the status once
    ///
    /// # Errors
    /// - `MissingCredential` when no private key is stored; nothing is sent
    /// - `UpgradeRejected` when the server refuses the command
    /// - `Transport` when the follow-up status query fails
    /// - `NotMounted` when called on an unmounted controller
    pub async fn submit_upgrade(&self) -> OrchestratorResult<StatusOutcome> {
        let project_id = {
            let shared = self.inner.shared.lock();
            if !shared.mounted {
                return Err(OrchestratorError::NotMounted);
            }
            if !self.inner.gate.allows_polling(&shared.context) {
                tracing::debug!(mount_id = %self.inner.mount_id, "gate closed; upgrade not submitted");
                return Ok(StatusOutcome::Skipped);
            }
            shared.context.project.id.clone()
        };

        let Some(private_key) = self.inner.deps.credentials.credential() else {
            tracing::warn!(mount_id = %self.inner.mount_id, "no private key stored; upgrade not submitted");
            self.inner
                .deps
                .notifier
                .notify(Notification::error(OrchestratorError::MissingCredential.to_string()));
            return Err(OrchestratorError::MissingCredential);
        };

        self.set_submit_in_flight(true);
        let result = self
            .inner
            .deps
            .api
            .start_upgrade(&UpgradeRequest {
                project_id: project_id.clone(),
                private_key,
            })
            .await;
        self.set_submit_in_flight(false);

        if let Err(err) = result {
            tracing::error!(mount_id = %self.inner.mount_id, project_id = %project_id, error = %err, "upgrade request failed");
            self.inner
                .deps
                .notifier
                .notify(Notification::error(format!("Failed to upgrade project: {err}")));
            return Err(OrchestratorError::UpgradeRejected(err));
        }

        tracing::info!(mount_id = %self.inner.mount_id, project_id = %project_id, "upgrade job accepted");
        self.inner.query_and_apply(QueryOrigin::Manual).await
    }

    fn set_submit_in_flight(&self, value: bool) {
        let mut shared = self.inner.shared.lock();
        shared.in_flight.submit = value;
        self.inner.publish(&shared);
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        let shared = self.inner.shared.lock();
        self.inner.snapshot_of(&shared)
    }

    /// Subscribe to snapshot changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> UpgradeState {
        self.inner.shared.lock().state
    }

    /// Whether the poll timer is armed
    #[inline]
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.shared.lock().poller.is_some()
    }

    #[inline]
    #[must_use]
    pub fn mount_id(&self) -> MountId {
        self.inner.mount_id
    }

    #[inline]
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.inner.shared.lock().context.project.id.clone()
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for PollingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingController")
            .field("mount_id", &self.inner.mount_id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureFlags;
    use crate::error::TransportError;
    use crate::ports::{MockCredentials, MockNotifier, MockRefresher, MockUpgradeApi};
    use crate::types::{PrivateKey, ProjectVersion, UpgradeJobStatus, UpgradeStatusResponse};

    fn open_gate() -> UpgradeGate {
        UpgradeGate::new(FeatureFlags::default().with_show_upgrade_project(true))
    }

    fn deps(
        api: MockUpgradeApi,
        credentials: MockCredentials,
        notifier: MockNotifier,
        refresher: MockRefresher,
    ) -> ControllerDeps {
        ControllerDeps {
            api: Arc::new(api),
            credentials: Arc::new(credentials),
            notifier: Arc::new(notifier),
            refresher: Arc::new(refresher),
        }
    }

    fn legacy_project() -> Project {
        Project::new("proj-1", ProjectVersion::V1)
    }

    #[tokio::test]
    async fn missing_credential_notifies_once_and_sends_nothing() {
        let mut api = MockUpgradeApi::new();
        api.expect_start_upgrade().never();
        api.expect_upgrade_status().never();

        let mut credentials = MockCredentials::new();
        credentials.expect_credential().times(1).returning(|| None);

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.text == "Private key not found")
            .times(1)
            .return_const(());

        let controller = PollingController::new(
            open_gate(),
            legacy_project(),
            Role::Admin,
            deps(api, credentials, notifier, MockRefresher::new()),
        );
        // Mark mounted without spawning the poller.
        controller.inner.shared.lock().mounted = true;

        let result = controller.submit_upgrade().await;
        assert!(matches!(result, Err(OrchestratorError::MissingCredential)));
        assert_eq!(controller.state(), UpgradeState::Idle);
    }

    #[tokio::test]
    async fn rejected_upgrade_notifies_and_keeps_state() {
        let mut api = MockUpgradeApi::new();
        api.expect_start_upgrade()
            .times(1)
            .returning(|_| Err(TransportError::status(500, "boom")));
        api.expect_upgrade_status().never();

        let mut credentials = MockCredentials::new();
        credentials
            .expect_credential()
            .returning(|| Some(PrivateKey::new("pk")));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.text.contains("boom"))
            .times(1)
            .return_const(());

        let controller = PollingController::new(
            open_gate(),
            legacy_project(),
            Role::Admin,
            deps(api, credentials, notifier, MockRefresher::new()),
        );
        controller.inner.shared.lock().mounted = true;

        let result = controller.submit_upgrade().await;
        assert!(matches!(result, Err(OrchestratorError::UpgradeRejected(_))));
        assert!(!controller.snapshot().loading);
        assert_eq!(controller.state(), UpgradeState::Idle);
    }

    #[tokio::test]
    async fn completion_refreshes_session_exactly_once() {
        let mut api = MockUpgradeApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_upgrade_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(UpgradeStatusResponse::new(Some(UpgradeJobStatus::InProgress))));
        api.expect_upgrade_status()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(UpgradeStatusResponse::new(None)));

        let mut refresher = MockRefresher::new();
        refresher.expect_refresh().times(1).return_const(());

        let controller = PollingController::new(
            open_gate(),
            legacy_project(),
            Role::Admin,
            deps(api, MockCredentials::new(), MockNotifier::new(), refresher),
        );
        controller.inner.shared.lock().mounted = true;

        let first = controller.refresh_status().await.unwrap();
        assert_eq!(
            first,
            StatusOutcome::Applied {
                from: UpgradeState::Idle,
                to: UpgradeState::InProgress,
            }
        );

        let second = controller.refresh_status().await.unwrap();
        assert!(second.requested_refresh());

        let third = controller.refresh_status().await.unwrap();
        assert_eq!(third, StatusOutcome::Ignored);
    }

    #[tokio::test]
    async fn closed_gate_skips_without_calling_api() {
        let mut api = MockUpgradeApi::new();
        api.expect_upgrade_status().never();

        let controller = PollingController::new(
            open_gate(),
            Project::new("proj-2", ProjectVersion::V2),
            Role::Admin,
            deps(api, MockCredentials::new(), MockNotifier::new(), MockRefresher::new()),
        );
        assert!(!controller.mount());
        assert_eq!(
            controller.refresh_status().await.unwrap(),
            StatusOutcome::Skipped
        );
        assert!(!controller.snapshot().visible);
    }
}
