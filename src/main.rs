use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flappy_server::config::ServerConfig;
use flappy_server::metrics::Metrics;
use flappy_server::session::SessionRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Flappy Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: timeout={}s, {} Hz default, max_sessions={}, {} shards",
        config.session_timeout.as_secs(),
        config.simulation.target_rate,
        config.max_sessions,
        config.session_shards
    );

    let metrics = Arc::new(Metrics::new());
    let runtime = SessionRuntime::new(config.clone(), metrics.clone());

    #[cfg(feature = "metrics_endpoint")]
    {
        let addr = std::net::SocketAddr::new(config.metrics_bind_address, config.metrics_port);
        let metrics = metrics.clone();
        let runtime = runtime.clone();
        tokio::spawn(async move {
            if let Err(e) = flappy_server::metrics::start_metrics_server(metrics, runtime, addr).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    // Periodic sweep and status report
    let status_runtime = runtime.clone();
    let status_interval = config.status_log_interval;
    let status_task = tokio::spawn(async move {
        let mut ticker = interval(status_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            status_runtime.sweep_expired();
            status_runtime.log_status();
        }
    });

    info!("Server ready");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Shutting down...");

    status_task.abort();
    runtime.shutdown().await;
    info!("Server stopped");

    Ok(())
}
