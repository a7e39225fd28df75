use std::sync::Arc;

use marketplace_admin_api::config::AppConfig;
use marketplace_admin_api::database::DatabaseManager;
use marketplace_admin_api::{router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn")),
        )
        .init();

    let config: &AppConfig = marketplace_admin_api::config::config();
    tracing::info!("Starting marketplace admin API in {:?} mode", config.environment);

    let db = DatabaseManager::connect(&config.database).await?;
    if config.database.run_migrations {
        db.migrate().await?;
    }

    let state = AppState::new(Arc::new(config.clone()), db);
    match state.load_providers().await {
        Ok(count) => tracing::info!("Loaded {} SMS provider configurations", count),
        Err(e) => tracing::error!("Failed to load SMS providers: {}", e),
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
