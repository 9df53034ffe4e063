//! Shared application state for all routes.

use crate::config::AppConfig;
use crate::mailer::ResetMailer;
use crate::tenant::directory::TenantDirectory;
use crate::tenant::middleware::{default_exemptions, ExemptRoutes};
use crate::tenant::pool::{MongoConnector, MongoPool, TenantPool};
use mongodb::{Client, Database};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Central control-plane database (tenant directory, hospital records).
    pub core_db: Database,
    pub directory: TenantDirectory,
    /// Process-wide tenant connection pool. Created once, never implicitly
    /// cleared.
    pub pool: Arc<MongoPool>,
    pub mailer: Arc<dyn ResetMailer>,
    pub exemptions: Arc<ExemptRoutes>,
}

impl AppState {
    pub fn new(client: Client, config: AppConfig, mailer: Arc<dyn ResetMailer>) -> Self {
        let config = Arc::new(config);
        let core_db = client
            .default_database()
            .unwrap_or_else(|| client.database("carebase"));
        AppState {
            directory: TenantDirectory::new(core_db.clone(), config.clone()),
            config,
            core_db,
            pool: Arc::new(TenantPool::new(MongoConnector)),
            mailer,
            exemptions: Arc::new(default_exemptions()),
        }
    }
}
