//! uporch Approvals - Secret approval policy client
//!
//! Create, update and delete approval policies, and list them per workspace
//! through a moka cache. Mutations never write to the cache; they invalidate
//! the workspace's entry so the next list re-fetches from the server.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod api;
pub mod cache;
pub mod error;
pub mod service;
pub mod types;

pub use api::PolicyApi;
pub use cache::{CacheStats, InvalidationEvent, PolicyCache, PolicyCacheKey};
pub use error::{PolicyError, PolicyResult};
pub use service::ApprovalPolicyService;
pub use types::{
    ApprovalPolicy, CreatePolicyRequest, DeletePolicyRequest, PolicyId, PolicyList,
    UpdatePolicyRequest, WorkspaceId,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
