use carebase::mailer::LogMailer;
use carebase::tenant::directory::ensure_indexes;
use carebase::{app, AppConfig, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("carebase=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let client = mongodb::Client::with_uri_str(&config.database_uri).await?;
    let state = AppState::new(client, config, Arc::new(LogMailer));
    ensure_indexes(&state.core_db).await?;

    let listener = TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!("carebase listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
