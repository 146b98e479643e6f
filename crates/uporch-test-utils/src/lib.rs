//! Testing utilities for uporch workspace
//!
//! Scripted fakes for the ports, plus fixtures for a controller whose gate
//! is open.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uporch_approvals::{
    ApprovalPolicy, CreatePolicyRequest, PolicyApi, PolicyId, UpdatePolicyRequest, WorkspaceId,
};
use uporch_core::{
    ControllerDeps, CredentialProvider, FeatureFlags, Notification, Notifier, PollingController,
    PrivateKey, Project, ProjectId, ProjectVersion, Role, SessionRefresher, StaticCredentials,
    TransportError, UpgradeApi, UpgradeGate, UpgradeJobStatus, UpgradeRequest,
    UpgradeStatusResponse,
};

type StatusReply = Result<UpgradeStatusResponse, TransportError>;

/// Upgrade API answering status queries from a script
///
/// When the script runs dry the last reply is repeated (or `null` if there
/// never was one).
#[derive(Default)]
pub struct ScriptedUpgradeApi {
    script: Mutex<VecDeque<(StatusReply, Duration)>>,
    last: Mutex<Option<StatusReply>>,
    status_calls: AtomicUsize,
    upgrade_requests: Mutex<Vec<UpgradeRequest>>,
    upgrade_error: Mutex<Option<TransportError>>,
}

impl ScriptedUpgradeApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status reply
    pub fn push_status(&self, status: Option<UpgradeJobStatus>) -> &Self {
        self.push_reply(Ok(UpgradeStatusResponse::new(status)), Duration::ZERO)
    }

    /// Queue a status reply delivered after `delay`
    pub fn push_delayed_status(&self, status: Option<UpgradeJobStatus>, delay: Duration) -> &Self {
        self.push_reply(Ok(UpgradeStatusResponse::new(status)), delay)
    }

    /// Queue a failing status query
    pub fn push_status_error(&self, err: TransportError) -> &Self {
        self.push_reply(Err(err), Duration::ZERO)
    }

    fn push_reply(&self, reply: StatusReply, delay: Duration) -> &Self {
        self.script.lock().push_back((reply, delay));
        self
    }

    /// Make every upgrade submission fail
    pub fn fail_upgrades_with(&self, err: TransportError) {
        *self.upgrade_error.lock() = Some(err);
    }

    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn upgrade_requests(&self) -> Vec<UpgradeRequest> {
        self.upgrade_requests.lock().clone()
    }
}

#[async_trait]
impl UpgradeApi for ScriptedUpgradeApi {
    async fn upgrade_status(&self, _project_id: &ProjectId) -> StatusReply {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        let (reply, delay) = match next {
            Some(entry) => entry,
            None => (
                self.last
                    .lock()
                    .clone()
                    .unwrap_or(Ok(UpgradeStatusResponse::default())),
                Duration::ZERO,
            ),
        };
        *self.last.lock() = Some(reply.clone());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    async fn start_upgrade(&self, request: &UpgradeRequest) -> Result<(), TransportError> {
        self.upgrade_requests.lock().push(request.clone());
        match self.upgrade_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Notifier that records everything it is asked to show
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

/// Refresher that counts invocations
#[derive(Debug, Default)]
pub struct CountingRefresher {
    calls: AtomicUsize,
}

impl CountingRefresher {
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionRefresher for CountingRefresher {
    fn refresh(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Credential provider that counts reads
#[derive(Debug, Default)]
pub struct CountingCredentials {
    inner: StaticCredentials,
    reads: AtomicUsize,
}

impl CountingCredentials {
    #[must_use]
    pub fn new(key: Option<&str>) -> Self {
        Self {
            inner: StaticCredentials::new(key.map(PrivateKey::new)),
            reads: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for CountingCredentials {
    fn credential(&self) -> Option<PrivateKey> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.credential()
    }
}

/// Controller wired to fakes, with handles to inspect them
pub struct Harness {
    pub api: Arc<ScriptedUpgradeApi>,
    pub credentials: Arc<CountingCredentials>,
    pub notifier: Arc<RecordingNotifier>,
    pub refresher: Arc<CountingRefresher>,
}

impl Harness {
    /// Harness whose credential store holds `key`
    #[must_use]
    pub fn new(key: Option<&str>) -> Self {
        Self {
            api: Arc::new(ScriptedUpgradeApi::new()),
            credentials: Arc::new(CountingCredentials::new(key)),
            notifier: Arc::new(RecordingNotifier::default()),
            refresher: Arc::new(CountingRefresher::default()),
        }
    }

    #[must_use]
    pub fn deps(&self) -> ControllerDeps {
        ControllerDeps {
            api: self.api.clone(),
            credentials: self.credentials.clone(),
            notifier: self.notifier.clone(),
            refresher: self.refresher.clone(),
        }
    }

    /// Controller for an admin on a legacy project with the toggle on
    #[must_use]
    pub fn controller(&self) -> PollingController {
        self.controller_for(open_gate(), legacy_project(), Role::Admin)
    }

    #[must_use]
    pub fn controller_for(&self, gate: UpgradeGate, project: Project, role: Role) -> PollingController {
        PollingController::new(gate, project, role, self.deps())
    }
}

pub fn open_gate() -> UpgradeGate {
    UpgradeGate::new(FeatureFlags::default().with_show_upgrade_project(true))
}

pub fn legacy_project() -> Project {
    Project::new("proj-legacy", ProjectVersion::V1)
}

pub fn current_project() -> Project {
    Project::new("proj-current", ProjectVersion::V2)
}

/// Let spawned tasks run without advancing the clock
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Which policy endpoint a [`FakePolicyApi`] call hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCall {
    Create(CreatePolicyRequest),
    Update(UpdatePolicyRequest),
    Delete(PolicyId),
    List(WorkspaceId),
}

/// In-memory policy endpoint that echoes requests back as payloads
#[derive(Debug, Default)]
pub struct FakePolicyApi {
    calls: Mutex<Vec<PolicyCall>>,
    policies: Mutex<Vec<ApprovalPolicy>>,
    failure: Mutex<Option<TransportError>>,
    list_delay: Mutex<Duration>,
}

impl FakePolicyApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace what the list endpoint returns
    pub fn set_policies(&self, policies: Vec<ApprovalPolicy>) {
        *self.policies.lock() = policies;
    }

    /// Hold every list response for `delay` after reading the policies
    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock() = delay;
    }

    /// Make every call fail
    pub fn fail_with(&self, err: TransportError) {
        *self.failure.lock() = Some(err);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<PolicyCall> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PolicyCall::List(_)))
            .count()
    }

    fn record(&self, call: PolicyCall) -> Result<(), TransportError> {
        self.calls.lock().push(call);
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PolicyApi for FakePolicyApi {
    async fn create_policy(
        &self,
        request: &CreatePolicyRequest,
    ) -> Result<serde_json::Value, TransportError> {
        self.record(PolicyCall::Create(request.clone()))?;
        Ok(serde_json::json!({ "approval": request }))
    }

    async fn update_policy(
        &self,
        request: &UpdatePolicyRequest,
    ) -> Result<serde_json::Value, TransportError> {
        self.record(PolicyCall::Update(request.clone()))?;
        Ok(serde_json::json!({ "approval": { "id": request.id, "changes": request } }))
    }

    async fn delete_policy(&self, id: &PolicyId) -> Result<serde_json::Value, TransportError> {
        self.record(PolicyCall::Delete(id.clone()))?;
        Ok(serde_json::json!({ "approval": { "id": id } }))
    }

    async fn list_policies(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<ApprovalPolicy>, TransportError> {
        self.record(PolicyCall::List(workspace_id.clone()))?;
        let policies = self.policies.lock().clone();
        let delay = *self.list_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(policies)
    }
}
