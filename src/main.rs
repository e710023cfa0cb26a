//! jobscout — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and the periodic
//! rate-limit sweep.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobscout::api::{self, AppState};
use jobscout::config::AppConfig;
use jobscout::metrics::Metrics;
use jobscout::ratelimit::RateLimiter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscout=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Hourly sweep over every predefined context. The limiter owns no timer;
/// this task is its external scheduler.
fn spawn_cleanup_task(limiter: std::sync::Arc<RateLimiter>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60 * 60));
        // The first tick fires immediately; skip it so boot stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.cleanup_old_entries();
            tracing::debug!(entries = limiter.entry_count(), "rate limit sweep done");
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = AppConfig::from_env();
    let metrics = Metrics::init(config.scrape_timeout_secs);
    let bind_addr = config.bind_addr.clone();

    let state = AppState::from_config(config);
    let _sweeper = spawn_cleanup_task(state.limiter.clone());

    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "jobscout listening");
    axum::serve(listener, app).await?;
    Ok(())
}
