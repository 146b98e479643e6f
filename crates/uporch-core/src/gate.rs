//! Upgrade gate
//!
//! Pure predicates deciding whether the upgrade control is shown and whether
//! the controller may talk to the status endpoint at all.

use crate::config::FeatureFlags;
use crate::types::{Project, Role};

/// Why the upgrade control is hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HiddenReason {
    /// Global feature toggle is off
    FeatureDisabled,
    /// Project is not on the legacy version
    NotLegacyVersion,
    /// Caller is not a project admin
    NotAdmin,
}

/// Result of evaluating the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateDecision {
    Open,
    Hidden(HiddenReason),
}

impl GateDecision {
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, GateDecision::Open)
    }
}

/// Inputs the gate is evaluated against, refreshed on every context change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateContext {
    pub project: Project,
    pub role: Role,
}

impl GateContext {
    #[inline]
    #[must_use]
    pub fn new(project: Project, role: Role) -> Self {
        Self { project, role }
    }
}

/// Visibility gate for the upgrade orchestration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeGate {
    features: FeatureFlags,
}

impl UpgradeGate {
    #[inline]
    #[must_use]
    pub fn new(features: FeatureFlags) -> Self {
        Self { features }
    }

    #[inline]
    #[must_use]
    pub fn feature_enabled(&self) -> bool {
        self.features.show_upgrade_project
    }

    #[inline]
    #[must_use]
    pub fn is_legacy_project(project: &Project) -> bool {
        project.version.is_legacy()
    }

    #[inline]
    #[must_use]
    pub fn is_admin(role: &Role) -> bool {
        role.is_admin()
    }

    /// Evaluate all predicates; the first failing one is reported
    #[must_use]
    pub fn evaluate(&self, context: &GateContext) -> GateDecision {
        if !self.feature_enabled() {
            GateDecision::Hidden(HiddenReason::FeatureDisabled)
        } else if !Self::is_legacy_project(&context.project) {
            GateDecision::Hidden(HiddenReason::NotLegacyVersion)
        } else if !Self::is_admin(&context.role) {
            GateDecision::Hidden(HiddenReason::NotAdmin)
        } else {
            GateDecision::Open
        }
    }

    /// Entry condition for polling
    #[inline]
    #[must_use]
    pub fn allows_polling(&self, context: &GateContext) -> bool {
        self.evaluate(context).is_open()
    }
}
