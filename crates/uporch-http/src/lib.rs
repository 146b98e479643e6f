//! uporch HTTP - reqwest transport
//!
//! One [`HttpClient`] implements both `UpgradeApi` and `PolicyApi`:
//! - `GET  /api/v2/workspace/{projectId}/upgrade/status`
//! - `POST /api/v2/workspace/{projectId}/upgrade`
//! - `POST|PATCH|DELETE /api/v1/secret-approvals[/{id}]`
//! - `GET  /api/v1/secret-approvals?workspaceId=`
//!
//! Non-2xx answers become `TransportError::Status` carrying the body text.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod client;
mod policy;

pub use client::HttpClient;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
