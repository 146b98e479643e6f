//! Upgrade state machine
//!
//! The observed upgrade state is a single enum; the status message and the
//! loading flag are derived from it instead of being stored next to it.

use crate::types::UpgradeJobStatus;
use serde::{Deserialize, Serialize};

/// Message shown while the job runs
pub const IN_PROGRESS_MESSAGE: &str = "Your upgrade is being processed.";

/// Message shown after the job failed
pub const FAILED_MESSAGE: &str = "Upgrade failed, please try again.";

/// Observed upgrade state for one mounted controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeState {
    /// Not polling
    #[default]
    Idle,
    /// Polling, no job status observed yet
    Polling,
    /// Job reported running
    InProgress,
    /// Job reported failed; retry is allowed
    Failed,
    /// Job went from a known status back to none; a session refresh was requested
    ReloadPending,
}

/// Requests whose completion the loading flag waits on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    /// Upgrade command submitted, no answer yet
    pub submit: bool,
    /// First status query after mount not answered yet
    pub initial_fetch: bool,
}

impl UpgradeState {
    /// Status line for the UI
    #[inline]
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        match self {
            UpgradeState::InProgress => Some(IN_PROGRESS_MESSAGE),
            UpgradeState::Failed => Some(FAILED_MESSAGE),
            UpgradeState::Idle | UpgradeState::Polling | UpgradeState::ReloadPending => None,
        }
    }

    /// Whether a non-null job status has been observed
    #[inline]
    #[must_use]
    pub fn has_observed_job(&self) -> bool {
        matches!(self, UpgradeState::InProgress | UpgradeState::Failed)
    }

    /// Whether status responses are still applied
    #[inline]
    #[must_use]
    pub fn accepts_status(&self) -> bool {
        !matches!(self, UpgradeState::ReloadPending)
    }

    /// Next state after a status response
    ///
    /// `ReloadPending` absorbs everything: once a refresh was requested no
    /// further transition happens.
    #[must_use]
    pub fn on_status(self, status: Option<UpgradeJobStatus>) -> UpgradeState {
        match (self, status) {
            (UpgradeState::ReloadPending, _) => UpgradeState::ReloadPending,
            (_, Some(UpgradeJobStatus::InProgress)) => UpgradeState::InProgress,
            (_, Some(UpgradeJobStatus::Failed)) => UpgradeState::Failed,
            (current, None) if current.has_observed_job() => UpgradeState::ReloadPending,
            (current, None) => current,
        }
    }

    /// Loading/disabled flag of the upgrade control
    ///
    /// `Failed` always reports not loading so the user can retry.
    #[must_use]
    pub fn is_loading(&self, in_flight: InFlight) -> bool {
        match self {
            UpgradeState::Failed => false,
            UpgradeState::InProgress | UpgradeState::ReloadPending => true,
            UpgradeState::Idle | UpgradeState::Polling => {
                in_flight.submit || in_flight.initial_fetch
            }
        }
    }
}

impl std::fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UpgradeState::Idle => "idle",
            UpgradeState::Polling => "polling",
            UpgradeState::InProgress => "in-progress",
            UpgradeState::Failed => "failed",
            UpgradeState::ReloadPending => "reload-pending",
        };
        f.write_str(name)
    }
}
