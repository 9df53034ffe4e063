//! Process-wide connection pool: at most one live connection per storage
//! address for the life of the process.
//!
//! The pool is generic over a [`Connect`] implementation so tests can
//! substitute a fake connector; production uses [`MongoConnector`].

use crate::error::AppError;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::event::sdam::SdamEvent;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

/// Establishes a connection to a storage address.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    type Conn: Send + Sync + 'static;

    async fn connect(&self, address: &str) -> Result<Self::Conn, AppError>;
}

/// Cache of live connections keyed by storage address.
///
/// Each address gets its own `OnceCell`, so concurrent first requests for the
/// same address serialize on a single establishment attempt while requests for
/// different addresses proceed fully in parallel. A failed attempt leaves the
/// cell empty and the next request retries; a successful connection is only
/// ever removed by an explicit [`evict`](TenantPool::evict) during tenant
/// deletion.
pub struct TenantPool<C: Connect> {
    connector: C,
    connections: Mutex<HashMap<String, Arc<OnceCell<Arc<C::Conn>>>>>,
}

impl<C: Connect> TenantPool<C> {
    pub fn new(connector: C) -> Self {
        TenantPool {
            connector,
            connections: Mutex::new(HashMap::new()),
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<OnceCell<Arc<C::Conn>>>>> {
        match self.connections.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Return the cached connection for `address`, establishing it first if
    /// this is the address's first request.
    pub async fn get_connection(&self, address: &str) -> Result<Arc<C::Conn>, AppError> {
        let cell = self
            .map()
            .entry(address.to_string())
            .or_default()
            .clone();
        let conn = cell
            .get_or_try_init(|| async {
                tracing::info!(address, "opening tenant database connection");
                self.connector.connect(address).await.map(Arc::new)
            })
            .await?;
        Ok(conn.clone())
    }

    /// Remove the entry for `address`, returning the live connection (if one
    /// was ever established) so the caller can tear down the underlying store.
    pub fn evict(&self, address: &str) -> Option<Arc<C::Conn>> {
        let cell = self.map().remove(address)?;
        cell.get().cloned()
    }

    /// True when a connection for `address` has been requested before.
    pub fn contains(&self, address: &str) -> bool {
        self.map().contains_key(address)
    }
}

/// Live handle to one tenant's MongoDB database. Cloning shares the
/// underlying client.
#[derive(Clone)]
pub struct TenantDb {
    client: Client,
    db: Database,
}

impl TenantDb {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Production connector: parses the address as a MongoDB URI (the database
/// name comes from the URI path) and verifies the connection with a ping.
pub struct MongoConnector;

#[async_trait]
impl Connect for MongoConnector {
    type Conn = TenantDb;

    async fn connect(&self, address: &str) -> Result<TenantDb, AppError> {
        let mut options = ClientOptions::parse(address).await?;
        // Connection-level failures after establishment are logged, not
        // evicted; the driver retries on its own.
        options.sdam_event_handler = Some(mongodb::event::EventHandler::callback(
            |event: SdamEvent| {
                if let SdamEvent::ServerHeartbeatFailed(e) = event {
                    tracing::error!(error = %e.failure, "MongoDB connection error");
                }
            },
        ));
        let client = Client::with_options(options)?;
        let db = client.default_database().ok_or_else(|| {
            AppError::Internal(format!("tenant address has no database name: {}", address))
        })?;
        db.run_command(doc! { "ping": 1 }).await?;
        crate::tenant::context::ensure_tenant_indexes(&db).await?;
        tracing::info!(address, "MongoDB connected");
        Ok(TenantDb { client, db })
    }
}

pub type MongoPool = TenantPool<MongoConnector>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeConn {
        address: String,
    }

    struct FakeConnector {
        connects: AtomicUsize,
        failures_left: AtomicUsize,
    }

    impl FakeConnector {
        fn new() -> Self {
            FakeConnector {
                connects: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(0),
            }
        }

        fn failing_first(n: usize) -> Self {
            FakeConnector {
                connects: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(n),
            }
        }
    }

    #[async_trait]
    impl Connect for FakeConnector {
        type Conn = FakeConn;

        async fn connect(&self, address: &str) -> Result<FakeConn, AppError> {
            // Widen the race window for the concurrency tests.
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Internal("connection refused".into()));
            }
            Ok(FakeConn {
                address: address.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn second_request_reuses_the_same_connection() {
        let pool = TenantPool::new(FakeConnector::new());
        let a = pool.get_connection("mongodb://db/acme_db").await.unwrap();
        let b = pool.get_connection("mongodb://db/acme_db").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_requests_open_exactly_one_connection() {
        let pool = Arc::new(TenantPool::new(FakeConnector::new()));
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                pool.get_connection("mongodb://db/fresh_db").await.unwrap()
            }));
        }
        let mut conns = Vec::new();
        for task in tasks {
            conns.push(task.await.unwrap());
        }
        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 1);
        for conn in &conns {
            assert!(Arc::ptr_eq(conn, &conns[0]));
            assert_eq!(conn.address, "mongodb://db/fresh_db");
        }
    }

    #[tokio::test]
    async fn distinct_addresses_get_distinct_connections() {
        let pool = Arc::new(TenantPool::new(FakeConnector::new()));
        let (a, b) = tokio::join!(
            pool.get_connection("mongodb://db/acme_db"),
            pool.get_connection("mongodb://db/zen_db"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_establishment_is_retried_on_the_next_request() {
        let pool = TenantPool::new(FakeConnector::failing_first(1));
        assert!(pool.get_connection("mongodb://db/flaky_db").await.is_err());
        let conn = pool.get_connection("mongodb://db/flaky_db").await.unwrap();
        assert_eq!(conn.address, "mongodb://db/flaky_db");
        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn evict_removes_the_entry_and_returns_the_connection() {
        let pool = TenantPool::new(FakeConnector::new());
        let conn = pool.get_connection("mongodb://db/gone_db").await.unwrap();
        let evicted = pool.evict("mongodb://db/gone_db").unwrap();
        assert!(Arc::ptr_eq(&conn, &evicted));
        assert!(!pool.contains("mongodb://db/gone_db"));

        // A later request for the same address opens a fresh connection.
        let fresh = pool.get_connection("mongodb://db/gone_db").await.unwrap();
        assert!(!Arc::ptr_eq(&conn, &fresh));
        assert_eq!(pool.connector.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn evict_of_unknown_address_is_a_no_op() {
        let pool = TenantPool::new(FakeConnector::new());
        assert!(pool.evict("mongodb://db/never_db").is_none());
    }
}
