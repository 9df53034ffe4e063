//! Tenant resolution and database-connection lifecycle: the directory mapping
//! tenants to storage addresses, the process-wide connection pool, the
//! per-request data context, and the resolution middleware.

pub mod context;
pub mod deletion;
pub mod directory;
pub mod middleware;
pub mod pool;

pub use context::TenantContext;
pub use deletion::decommission_tenant;
pub use directory::{Tenant, TenantDirectory};
pub use middleware::{resolve_tenant, ExemptRoutes, TENANT_ID_HEADER};
pub use pool::{MongoPool, TenantDb, TenantPool};
