//! Murmur feed server
//!
//! # Usage
//!
//! ```bash
//! PORT=8080 METRICS_ADDR=0.0.0.0:9090 cargo run --bin murmur-server
//! ```

use anyhow::Context;
use murmur_runtime::metrics::{MetricsError, MetricsServer};
use murmur_server::{Config, build_state, metrics_router};
use murmur_web::build_router;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.server.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = config.bind_addr().context("invalid HOST")?;
    info!(
        %addr,
        metrics = ?config.server.metrics_addr,
        subscriber_buffer = config.stream.subscriber_buffer,
        batch_size = config.cascade.batch_size,
        max_retries = config.cascade.max_retries,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.server.metrics_addr {
        start_metrics(MetricsServer::new(metrics_addr)).await?;
    }

    let app = build_router(build_state(&config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Murmur server listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.context("server task panicked")??;
            return Ok(());
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
        }
    }

    info!(timeout = ?config.server.shutdown_timeout, "Shutting down gracefully");
    let _ = shutdown_tx.send(true);

    // Open event streams never finish on their own.
    match tokio::time::timeout(config.server.shutdown_timeout, server).await {
        Ok(result) => result.context("server task panicked")??,
        Err(_) => warn!("Shutdown timeout elapsed, closing remaining connections"),
    }

    info!("Server stopped");
    Ok(())
}

async fn start_metrics(mut metrics: MetricsServer) -> Result<(), MetricsError> {
    metrics.start()?;
    let Some(handle) = metrics.handle().cloned() else {
        return Ok(());
    };

    let listener = tokio::net::TcpListener::bind(metrics.addr()).await?;
    info!(addr = %metrics.addr(), "Metrics available at /metrics");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics_router(handle)).await {
            warn!(error = %e, "Metrics server stopped");
        }
    });
    Ok(())
}
