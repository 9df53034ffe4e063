//! Carebase: multi-tenant hospital backend. Every tenant owns an isolated
//! MongoDB database; requests are routed to it via the `x-tenant-id` header.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod mailer;
pub mod models;
pub mod roles;
pub mod routes;
pub mod state;
pub mod tenant;

pub use config::{AppConfig, RunMode};
pub use error::AppError;
pub use roles::ensure_default_roles;
pub use routes::app;
pub use state::AppState;
pub use tenant::context::TenantContext;
pub use tenant::directory::{create_subdomain, TenantDirectory};
pub use tenant::pool::{Connect, MongoConnector, MongoPool, TenantDb, TenantPool};
