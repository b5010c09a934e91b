//! billing-sync server entrypoint.

use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use billing_sync::adapters::{
    webhook_router, HttpLimits, InMemoryOrganizationStore, PostgresOrganizationStore,
    WebhookAppState,
};
use billing_sync::config::{AppConfig, DatabaseConfig};
use billing_sync::ports::OrganizationStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    config.validate()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting billing-sync"
    );

    if !config.webhook.has_signing_secret() {
        tracing::warn!("No webhook signing secret configured; every webhook will be rejected");
    }

    let prices = config.webhook.price_tier_map()?;
    tracing::info!(
        prices = prices.len(),
        strict = prices.is_strict(),
        "Price catalog loaded"
    );

    let store: Arc<dyn OrganizationStore> = match &config.database {
        Some(database) => Arc::new(PostgresOrganizationStore::new(connect(database).await?)),
        None => {
            tracing::warn!("No database configured; using in-memory organization store");
            Arc::new(InMemoryOrganizationStore::new())
        }
    };

    let state = WebhookAppState::new(config.webhook.verifier(), prices, store);
    let limits = HttpLimits {
        request_timeout: config.server.request_timeout(),
        max_body_bytes: config.server.max_body_bytes,
    };
    let app = webhook_router(state, limits);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// RUST_LOG wins over the configured filter. JSON output in production.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect(database: &DatabaseConfig) -> Result<sqlx::PgPool, Box<dyn Error>> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect(&database.url)
        .await?;

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    tracing::info!("Database connection established");
    Ok(pool)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
