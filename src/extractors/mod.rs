//! Request extractors: the tenant data context attached by the middleware and
//! the authenticated-user guard.

pub mod auth;
pub mod tenant;

pub use auth::AuthUser;
