//! Request handlers. All tenant-data handlers consume the [`TenantContext`]
//! attached by the resolution middleware.
//!
//! [`TenantContext`]: crate::tenant::context::TenantContext

pub mod auth;
pub mod hospitals;
pub mod users;
