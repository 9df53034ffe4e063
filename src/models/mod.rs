//! Persistent document types. Control-plane documents (`Hospital`) live on the
//! central database; the rest are tenant-local and only ever touched through a
//! [`TenantContext`](crate::tenant::context::TenantContext).

pub mod doctor;
pub mod hospital;
pub mod role;
pub mod user;

pub use doctor::Doctor;
pub use hospital::{Department, Hospital, HospitalStatus};
pub use role::Role;
pub use user::User;
