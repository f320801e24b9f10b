use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use employee_forms_api::app::{app, AppState};
use employee_forms_api::config::{self, StoreBackend};
use employee_forms_api::database::{DatabaseManager, FormStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    config.check().map_err(anyhow::Error::msg)?;
    tracing::info!("Starting Employee Forms API in {:?} mode", config.environment);

    let (store, pool): (Arc<dyn FormStore>, _) = match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            (Arc::new(MemoryStore::new()), None)
        }
        StoreBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            let store = PgStore::new(pool.clone());
            if config.database.auto_migrate {
                store.migrate().await?;
            }
            (Arc::new(store), Some(pool))
        }
    };

    let state = AppState::new(store, config)?;
    let router = app(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🚀 Employee Forms API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server")?;

    if let Some(pool) = pool {
        DatabaseManager::close(&pool).await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
