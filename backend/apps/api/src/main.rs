//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod app;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use platform::rate_limit::{NeverSweep, RateLimiter};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::Services;
use crate::config::{AppConfig, SweepMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api=info,auth=info,tutor=info,platform=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Missing secrets stop the process here, before anything is served
    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Rate limiter: inline sweeping, or a background sweeper
    let limiter = RateLimiter::in_memory(config.rate_limits.clone());
    let limiter = match &config.sweep {
        SweepMode::Interval(every) => {
            let limiter = limiter.with_sweep_policy(Arc::new(NeverSweep));
            limiter.spawn_sweeper(*every);
            tracing::info!(interval_secs = every.as_secs(), "Background rate-limit sweeper started");
            limiter
        }
        mode => match mode.inline_policy() {
            Some(policy) => limiter.with_sweep_policy(policy),
            None => limiter,
        },
    };

    let services = Services::new(&config, pool, limiter)?;
    let app = app::router(&config, services);

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
