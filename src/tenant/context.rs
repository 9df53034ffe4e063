//! Per-request tenant-scoped data context.
//!
//! Wraps the pooled connection resolved by the middleware and hands out
//! collection accessors bound to that tenant's physical database. Isolation
//! between tenants comes from the handles pointing at distinct databases,
//! never from filter predicates.

use crate::error::AppError;
use crate::models::{Doctor, Role, User};
use crate::tenant::pool::TenantDb;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// A document type stored in a tenant-local collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin {
    const COLLECTION: &'static str;
}

/// Handle to one tenant's data for the duration of a request. Cheap to clone;
/// dropping it leaves the underlying pooled connection alive.
#[derive(Clone)]
pub struct TenantContext {
    conn: Arc<TenantDb>,
}

impl TenantContext {
    pub fn new(conn: Arc<TenantDb>) -> Self {
        TenantContext { conn }
    }

    pub fn database(&self) -> &Database {
        self.conn.database()
    }

    /// Bind an entity's collection to this tenant's database.
    pub fn collection<E: Entity>(&self) -> Collection<E> {
        self.database().collection(E::COLLECTION)
    }

    pub fn users(&self) -> Collection<User> {
        self.collection()
    }

    pub fn roles(&self) -> Collection<Role> {
        self.collection()
    }

    pub fn doctors(&self) -> Collection<Doctor> {
        self.collection()
    }
}

/// Unique indexes backing the tenant-local uniqueness invariants (user email,
/// doctor license and user link). Idempotent; run when a tenant connection is
/// first established.
pub async fn ensure_tenant_indexes(db: &Database) -> Result<(), AppError> {
    let unique = |keys: Document| {
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };

    db.collection::<User>(User::COLLECTION)
        .create_index(unique(doc! { "email": 1 }))
        .await?;

    let doctors = db.collection::<Doctor>(Doctor::COLLECTION);
    doctors.create_index(unique(doc! { "userId": 1 })).await?;
    doctors
        .create_index(unique(doc! { "medicalLicenseNumber": 1 }))
        .await?;

    Ok(())
}
