// Main entry point for API server

use anyhow::{Context, Result};
use server_core::{kernel::start_scheduler, kernel::ServerDeps, server::build_app, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,job_crawlers=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tech Jobs Aggregator API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Cache backend, crawlers, orchestrator
    let deps = ServerDeps::from_config(&config)
        .await
        .context("Failed to initialize server dependencies")?;

    if config.jobs.clear_cache_on_startup {
        let removed = deps
            .jobs
            .clear_cache()
            .await
            .context("Failed to clear job cache")?;
        tracing::info!("Cleared {} cached job keys", removed);
    }

    // Initial refresh runs in the background so the API binds immediately
    if config.jobs.refresh_on_startup {
        let jobs = deps.jobs.clone();
        tokio::spawn(async move {
            let report = jobs.refresh_all().await;
            tracing::info!(
                "Startup refresh complete: {} postings, {} sources failed",
                report.total_postings(),
                report.failed.len()
            );
        });
    }

    let mut scheduler = start_scheduler(deps.jobs.clone(), &config.jobs.update_cron)
        .await
        .context("Failed to start scheduler")?;

    // Build application
    let app = build_app(deps.clone(), &config.api_prefix, &config.allowed_origins);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!(
        "Jobs API: http://localhost:{}{}/jobs",
        config.port,
        config.api_prefix
    );
    tracing::info!(
        "Health check: http://localhost:{}{}/health",
        config.port,
        config.api_prefix
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down");
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("Scheduler shutdown failed: {}", e);
    }
    deps.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
