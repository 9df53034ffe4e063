//! Password-reset mail delivery boundary. The actual SMTP integration lives
//! outside this service; handlers only depend on this trait.

use crate::error::AppError;
use async_trait::async_trait;

#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset_link(&self, to: &str, link: &str) -> Result<(), AppError>;
}

/// Logs the reset link instead of delivering it. Used in development and as
/// the default until an SMTP backend is wired in.
pub struct LogMailer;

#[async_trait]
impl ResetMailer for LogMailer {
    async fn send_reset_link(&self, to: &str, link: &str) -> Result<(), AppError> {
        tracing::info!(to, link, "password reset link issued");
        Ok(())
    }
}
