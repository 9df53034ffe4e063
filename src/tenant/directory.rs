//! Tenant directory: durable lookup from a tenant-facing identifier to the
//! storage address of its database, backed by the central control-plane store.

use crate::config::{AppConfig, RunMode};
use crate::error::AppError;
use crate::models::Hospital;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Directory record mapping a tenant's slug to its storage address. The
/// address is immutable once created; the record is only removed when the
/// owning hospital is deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Subdomain slug. Unique across all tenants.
    pub hospital_name: String,
    /// Connection URI of the tenant's database. Unique; doubles as the
    /// connection pool's cache key.
    pub database_uri: String,
}

/// Derive the URL-safe subdomain slug from a display name. Deterministic,
/// no side effects: lowercase, whitespace runs become hyphens.
pub fn create_subdomain(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Clone)]
pub struct TenantDirectory {
    db: Database,
    config: Arc<AppConfig>,
}

impl TenantDirectory {
    pub const COLLECTION: &'static str = "tenants";

    pub fn new(db: Database, config: Arc<AppConfig>) -> Self {
        TenantDirectory { db, config }
    }

    fn tenants(&self) -> Collection<Tenant> {
        self.db.collection(Self::COLLECTION)
    }

    fn hospitals(&self) -> Collection<Hospital> {
        self.db.collection(Hospital::COLLECTION)
    }

    /// Storage address for a slug: `<base>/<slug>_db`, with replica-set and
    /// write-concern parameters appended in production.
    pub fn database_uri_for(&self, slug: &str) -> String {
        match self.config.mode {
            RunMode::Development => format!("{}/{}_db", self.config.tenant_base_uri, slug),
            RunMode::Production => format!(
                "{}/{}_db?retryWrites=true&w=majority&appName={}",
                self.config.tenant_base_uri, slug, self.config.cluster_app_name
            ),
        }
    }

    /// Persist a new directory record for `slug`. A duplicate slug or address
    /// surfaces as `Conflict` via the unique indexes.
    pub async fn create_tenant(&self, slug: &str) -> Result<Tenant, AppError> {
        let mut tenant = Tenant {
            id: None,
            hospital_name: slug.to_string(),
            database_uri: self.database_uri_for(slug),
        };
        let result = self
            .tenants()
            .insert_one(&tenant)
            .await
            .map_err(|e| AppError::conflict_on_duplicate(e, "Tenant already exists"))?;
        tenant.id = result.inserted_id.as_object_id();
        Ok(tenant)
    }

    pub async fn find_by_subdomain(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        Ok(self
            .tenants()
            .find_one(doc! { "hospitalName": slug })
            .await?)
    }

    /// Look a tenant up by the identifier clients send in `x-tenant-id`.
    /// A value that is not a valid ObjectId is treated as an unknown tenant.
    pub async fn find_by_tenant_id(&self, id: &str) -> Result<Option<Tenant>, AppError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        Ok(self.tenants().find_one(doc! { "_id": oid }).await?)
    }

    /// Resolve a subdomain to the tenant identifier by way of the owning
    /// hospital record. The hospital and the tenant record are created
    /// together but keyed independently, hence the two hops.
    pub async fn get_tenant_id(&self, subdomain: &str) -> Result<ObjectId, AppError> {
        let hospital = self
            .hospitals()
            .find_one(doc! { "subdomain": subdomain })
            .await?
            .ok_or_else(|| AppError::NotFound("Hospital does not exist".into()))?;

        let tenant = self
            .find_by_subdomain(&hospital.subdomain)
            .await?
            .ok_or_else(|| AppError::NotFound("Tenant does not exist".into()))?;

        tenant
            .id
            .ok_or_else(|| AppError::Internal("tenant record has no id".into()))
    }

    /// Remove a directory record. `NotFound` when it is already gone.
    pub async fn delete_tenant(&self, id: ObjectId) -> Result<(), AppError> {
        let result = self.tenants().delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::NotFound("Tenant not found".into()));
        }
        Ok(())
    }
}

/// Create the unique indexes backing the directory's invariants: slug and
/// storage address unique on `tenants`; subdomain, email and tenant id unique
/// on `hospitals`. Idempotent; called once at startup.
pub async fn ensure_indexes(db: &Database) -> Result<(), AppError> {
    let unique = |keys: Document| {
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };

    let tenants: Collection<Tenant> = db.collection(TenantDirectory::COLLECTION);
    tenants.create_index(unique(doc! { "hospitalName": 1 })).await?;
    tenants.create_index(unique(doc! { "databaseUri": 1 })).await?;

    let hospitals: Collection<Hospital> = db.collection(Hospital::COLLECTION);
    hospitals.create_index(unique(doc! { "subdomain": 1 })).await?;
    hospitals.create_index(unique(doc! { "email": 1 })).await?;
    hospitals.create_index(unique(doc! { "tenantId": 1 })).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdomain_is_lowercased_and_hyphenated() {
        assert_eq!(create_subdomain("Acme General Hospital"), "acme-general-hospital");
    }

    #[test]
    fn subdomain_collapses_whitespace_runs() {
        assert_eq!(create_subdomain("  St.   Mary's \t Clinic "), "st.-mary's-clinic");
        assert_eq!(create_subdomain("Solo"), "solo");
    }

    fn config_with_mode(mode: RunMode) -> AppConfig {
        AppConfig {
            database_uri: "mongodb://localhost:27017/carebase".into(),
            tenant_base_uri: "mongodb://cluster.example.net".into(),
            mode,
            cluster_app_name: "Cluster0".into(),
            jwt_secret: "secret".into(),
            frontend_domain: "http://localhost:5173".into(),
            bind_addr: "127.0.0.1:0".into(),
        }
    }

    #[tokio::test]
    async fn development_uri_has_no_query_parameters() {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let dir = TenantDirectory::new(
            client.database("carebase"),
            Arc::new(config_with_mode(RunMode::Development)),
        );
        assert_eq!(
            dir.database_uri_for("acme-general-hospital"),
            "mongodb://cluster.example.net/acme-general-hospital_db"
        );
    }

    #[tokio::test]
    async fn production_uri_appends_write_concern_parameters() {
        let client = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        let dir = TenantDirectory::new(
            client.database("carebase"),
            Arc::new(config_with_mode(RunMode::Production)),
        );
        assert_eq!(
            dir.database_uri_for("acme-general-hospital"),
            "mongodb://cluster.example.net/acme-general-hospital_db?retryWrites=true&w=majority&appName=Cluster0"
        );
    }
}
