//! uporch Core - Project upgrade orchestration
//!
//! Client-side driver for the server-side project version upgrade:
//! - Gates the whole feature on toggle, legacy version and admin role
//! - Polls the upgrade job status on a fixed cadence
//! - Derives the status message and loading flag from one state enum
//! - Requests a session refresh when the job completes
//! - Submits the upgrade with the locally stored private key
//!
//! # Example
//!
//! ```rust,ignore
//! use uporch_core::prelude::*;
//!
//! # async fn example(deps: ControllerDeps) -> Result<(), OrchestratorError> {
//! let gate = UpgradeGate::new(FeatureFlags::default().with_show_upgrade_project(true));
//! let project = Project::new("proj-1", ProjectVersion::V1);
//! let controller = PollingController::new(gate, project, Role::Admin, deps);
//!
//! controller.mount();
//! controller.submit_upgrade().await?;
//! println!("{:?}", controller.snapshot());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod adapters;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod ports;
pub mod state;
pub mod types;

pub use adapters::{EnvCredentials, FileCredentials, FnRefresher, StaticCredentials, TracingNotifier};
pub use config::{ClientConfig, FeatureFlags, DEFAULT_CREDENTIAL_KEY, SHOW_UPGRADE_PROJECT_ENV};
pub use controller::{ControllerDeps, ControllerSnapshot, PollingController, StatusOutcome, POLL_INTERVAL};
pub use error::{ConfigError, OrchestratorError, OrchestratorResult, TransportError};
pub use gate::{GateContext, GateDecision, HiddenReason, UpgradeGate};
pub use ports::{
    CredentialProvider, Notification, NotificationKind, Notifier, SessionRefresher, UpgradeApi,
};
pub use state::{InFlight, UpgradeState, FAILED_MESSAGE, IN_PROGRESS_MESSAGE};
pub use types::{
    MountId, PrivateKey, Project, ProjectId, ProjectVersion, Role, UpgradeJobStatus,
    UpgradeRequest, UpgradeStatusResponse,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving an upgrade
    pub use crate::{
        ClientConfig, ControllerDeps, ControllerSnapshot, FeatureFlags, OrchestratorError,
        PollingController, Project, ProjectVersion, Role, StatusOutcome, UpgradeGate,
        UpgradeState,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
