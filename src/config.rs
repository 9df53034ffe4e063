//! Environment configuration. All values have local-dev defaults; production
//! deployments set them via the environment (loaded from `.env` by the binary).

use crate::error::AppError;
use std::str::FromStr;

/// Deployment mode. Controls the query parameters appended to tenant
/// database URIs (`development` appends none).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            _ => Err(AppError::BadRequest(format!(
                "invalid APP_ENV: {} (expected development or production)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// URI of the central control-plane database (tenant directory, hospitals).
    pub database_uri: String,
    /// Base URI under which per-tenant databases are created (`<base>/<slug>_db`).
    pub tenant_base_uri: String,
    pub mode: RunMode,
    /// `appName` query parameter appended to tenant URIs in production.
    pub cluster_app_name: String,
    pub jwt_secret: String,
    /// Frontend origin used to build password-reset links.
    pub frontend_domain: String,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig, AppError> {
        let mode: RunMode = std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".into())
            .parse()?;
        Ok(AppConfig {
            database_uri: std::env::var("DATABASE_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017/carebase".into()),
            tenant_base_uri: std::env::var("TENANT_BASE_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".into()),
            mode,
            cluster_app_name: std::env::var("MONGO_APP_NAME")
                .unwrap_or_else(|_| "Cluster0".into()),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev-secret".into()),
            frontend_domain: std::env::var("FRONTEND_DOMAIN")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parses_aliases() {
        assert_eq!("development".parse::<RunMode>().unwrap(), RunMode::Development);
        assert_eq!("PROD".parse::<RunMode>().unwrap(), RunMode::Production);
        assert!("staging".parse::<RunMode>().is_err());
    }
}
