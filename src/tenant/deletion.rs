//! Tenant decommissioning: removing a tenant end to end — its directory
//! record, pooled connection, physical store, and owning hospital record.
//! The sequence is generic over the control-plane records and the pool's
//! connector so it can run against in-memory fakes.

use crate::error::AppError;
use crate::models::Hospital;
use crate::state::AppState;
use crate::tenant::directory::Tenant;
use crate::tenant::pool::{Connect, TenantDb, TenantPool};
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};

/// Control-plane records consulted and removed while decommissioning.
#[async_trait]
pub trait DecommissionRecords {
    async fn hospital_exists(&self, id: ObjectId) -> Result<bool, AppError>;
    async fn find_tenant(&self, id: &str) -> Result<Option<Tenant>, AppError>;
    async fn delete_tenant(&self, id: ObjectId) -> Result<(), AppError>;
    async fn delete_hospital(&self, id: ObjectId) -> Result<(), AppError>;
}

#[async_trait]
impl DecommissionRecords for AppState {
    async fn hospital_exists(&self, id: ObjectId) -> Result<bool, AppError> {
        Ok(Hospital::collection(&self.core_db)
            .find_one(doc! { "_id": id })
            .await?
            .is_some())
    }

    async fn find_tenant(&self, id: &str) -> Result<Option<Tenant>, AppError> {
        self.directory.find_by_tenant_id(id).await
    }

    async fn delete_tenant(&self, id: ObjectId) -> Result<(), AppError> {
        self.directory.delete_tenant(id).await
    }

    async fn delete_hospital(&self, id: ObjectId) -> Result<(), AppError> {
        Hospital::collection(&self.core_db)
            .delete_one(doc! { "_id": id })
            .await?;
        Ok(())
    }
}

/// Dropping a tenant's physical store through its pooled connection.
#[async_trait]
pub trait DropStore {
    async fn drop_store(&self) -> Result<(), AppError>;
}

#[async_trait]
impl DropStore for TenantDb {
    async fn drop_store(&self) -> Result<(), AppError> {
        self.database().drop().await?;
        Ok(())
    }
}

/// Remove a tenant completely. Both records are verified first, so an absent
/// record fails the request before any destructive step. Then the directory
/// record goes, then the physical store through the pooled connection, then
/// the pool entry, and finally the hospital record.
pub async fn decommission_tenant<R, C>(
    records: &R,
    pool: &TenantPool<C>,
    tenant_id: &str,
    hospital_id: ObjectId,
) -> Result<(), AppError>
where
    R: DecommissionRecords + Sync,
    C: Connect,
    C::Conn: DropStore,
{
    if !records.hospital_exists(hospital_id).await? {
        return Err(AppError::NotFound("Hospital not found".into()));
    }
    let tenant = records
        .find_tenant(tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".into()))?;
    let tenant_oid = tenant
        .id
        .ok_or_else(|| AppError::Internal("tenant record has no id".into()))?;

    records.delete_tenant(tenant_oid).await?;

    let conn = pool.get_connection(&tenant.database_uri).await?;
    conn.drop_store().await?;
    let evicted = pool.evict(&tenant.database_uri);
    tracing::info!(
        address = %tenant.database_uri,
        evicted = evicted.is_some(),
        "tenant store dropped and connection evicted"
    );

    records.delete_hospital(hospital_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type OpLog = Arc<Mutex<Vec<&'static str>>>;

    struct FakeStore {
        log: OpLog,
    }

    #[async_trait]
    impl DropStore for FakeStore {
        async fn drop_store(&self) -> Result<(), AppError> {
            self.log.lock().unwrap().push("drop_store");
            Ok(())
        }
    }

    struct FakeConnector {
        log: OpLog,
    }

    #[async_trait]
    impl Connect for FakeConnector {
        type Conn = FakeStore;

        async fn connect(&self, _address: &str) -> Result<FakeStore, AppError> {
            self.log.lock().unwrap().push("connect");
            Ok(FakeStore {
                log: self.log.clone(),
            })
        }
    }

    struct FakeRecords {
        log: OpLog,
        hospital: Option<ObjectId>,
        tenant: Option<Tenant>,
        tenant_vanished: bool,
    }

    #[async_trait]
    impl DecommissionRecords for FakeRecords {
        async fn hospital_exists(&self, id: ObjectId) -> Result<bool, AppError> {
            Ok(self.hospital == Some(id))
        }

        async fn find_tenant(&self, id: &str) -> Result<Option<Tenant>, AppError> {
            let oid = ObjectId::parse_str(id).ok();
            Ok(self.tenant.clone().filter(|t| t.id == oid))
        }

        async fn delete_tenant(&self, _id: ObjectId) -> Result<(), AppError> {
            if self.tenant_vanished {
                return Err(AppError::NotFound("Tenant not found".into()));
            }
            self.log.lock().unwrap().push("delete_tenant");
            Ok(())
        }

        async fn delete_hospital(&self, _id: ObjectId) -> Result<(), AppError> {
            self.log.lock().unwrap().push("delete_hospital");
            Ok(())
        }
    }

    const ADDRESS: &str = "mongodb://db/acme-general-hospital_db";

    fn fixtures(log: &OpLog) -> (FakeRecords, TenantPool<FakeConnector>, ObjectId, ObjectId) {
        let tenant_oid = ObjectId::new();
        let hospital_oid = ObjectId::new();
        let records = FakeRecords {
            log: log.clone(),
            hospital: Some(hospital_oid),
            tenant: Some(Tenant {
                id: Some(tenant_oid),
                hospital_name: "acme-general-hospital".into(),
                database_uri: ADDRESS.into(),
            }),
            tenant_vanished: false,
        };
        let pool = TenantPool::new(FakeConnector { log: log.clone() });
        (records, pool, tenant_oid, hospital_oid)
    }

    #[tokio::test]
    async fn deletion_runs_directory_then_store_then_hospital() {
        let log: OpLog = Arc::default();
        let (records, pool, tenant_oid, hospital_oid) = fixtures(&log);

        decommission_tenant(&records, &pool, &tenant_oid.to_hex(), hospital_oid)
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["delete_tenant", "connect", "drop_store", "delete_hospital"]
        );
        // The pool entry is gone; a later request for the same address would
        // have to reconnect.
        assert!(!pool.contains(ADDRESS));
    }

    #[tokio::test]
    async fn missing_hospital_fails_before_any_destructive_step() {
        let log: OpLog = Arc::default();
        let (mut records, pool, tenant_oid, hospital_oid) = fixtures(&log);
        records.hospital = None;

        let err = decommission_tenant(&records, &pool, &tenant_oid.to_hex(), hospital_oid)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref m) if m == "Hospital not found"));
        assert!(log.lock().unwrap().is_empty());
        assert!(!pool.contains(ADDRESS));
    }

    #[tokio::test]
    async fn missing_tenant_fails_before_any_destructive_step() {
        let log: OpLog = Arc::default();
        let (mut records, pool, tenant_oid, hospital_oid) = fixtures(&log);
        records.tenant = None;

        let err = decommission_tenant(&records, &pool, &tenant_oid.to_hex(), hospital_oid)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref m) if m == "Tenant not found"));
        assert!(log.lock().unwrap().is_empty());
        assert!(!pool.contains(ADDRESS));
    }

    #[tokio::test]
    async fn directory_failure_stops_before_the_store_is_touched() {
        let log: OpLog = Arc::default();
        let (mut records, pool, tenant_oid, hospital_oid) = fixtures(&log);
        records.tenant_vanished = true;

        let err = decommission_tenant(&records, &pool, &tenant_oid.to_hex(), hospital_oid)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(log.lock().unwrap().is_empty());
        assert!(!pool.contains(ADDRESS));
    }
}
