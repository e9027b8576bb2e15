use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use persistence::repositories::{NotificationRepository, SchoolRepository};
use school_manager_api::app::{create_app, AppState};
use school_manager_api::config::Config;
use school_manager_api::jobs::{JobScheduler, SubscriptionExpiryJob};
use school_manager_api::middleware;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!("Starting School Manager API v{}", env!("CARGO_PKG_VERSION"));

    let jwt = config.jwt.build().context("Invalid JWT configuration")?;

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let state = AppState::new(
        config.clone(),
        jwt,
        Arc::new(SchoolRepository::new(pool.clone())),
        Arc::new(NotificationRepository::new(pool.clone())),
    )
    .with_pool(pool);

    let mut scheduler = JobScheduler::new();
    if config.notifications.periodic_scan_enabled {
        scheduler.register(SubscriptionExpiryJob::new(
            state.scanner.clone(),
            config.notifications.scan_interval_minutes,
        ));
    } else {
        info!("Periodic subscription scan disabled");
    }
    scheduler.start();

    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(30)).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
