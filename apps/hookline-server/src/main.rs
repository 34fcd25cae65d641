//! Hookline webhook dispatch service.
//!
//! Hosts the webhook admin API (event types, endpoints, events, deliveries)
//! and the background delivery worker.

mod config;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use hookline_db::store::PgStore;
use hookline_webhooks::validation::UrlPolicy;
use hookline_webhooks::worker::WorkerConfig;
use hookline_webhooks::{webhooks_router, DeliveryWorker, WebhooksState};

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.rust_log))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.host,
        port = config.port,
        env = %config.app_env,
        "Starting hookline server"
    );

    // Validate security configuration
    match config.validate_security_config() {
        Ok(warnings) => {
            for warning in &warnings {
                tracing::warn!(target: "security", "{}", warning);
            }
            if !warnings.is_empty() {
                tracing::warn!(
                    target: "security",
                    count = warnings.len(),
                    "Insecure settings detected (allowed in {} mode)",
                    config.app_env
                );
            }
        }
        Err(errors) => {
            for error in &errors {
                tracing::error!(target: "security", "{}", error);
            }
            eprintln!(
                "FATAL: {} insecure setting(s) detected in production mode. \
                 Set a proper encryption key or use APP_ENV=development.",
                errors.len()
            );
            std::process::exit(1);
        }
    }

    // Create database connection pool
    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
    {
        Ok(p) => {
            info!("Database connection established");
            p
        }
        Err(e) => {
            eprintln!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = hookline_db::run_migrations(&pool).await {
        eprintln!("Failed to run database migrations: {e}");
        std::process::exit(1);
    }

    let store = Arc::new(PgStore::new(pool));
    let url_policy = UrlPolicy {
        allow_http: config.allow_http,
        allow_private_hosts: config.allow_private_hosts,
    };
    let state = WebhooksState::with_url_policy(
        store.clone(),
        config.webhook_encryption_key.to_vec(),
        url_policy,
    );

    // Start the delivery worker
    let worker = Arc::new(DeliveryWorker::new(
        store,
        state.delivery_service.clone(),
        WorkerConfig {
            concurrency: config.worker.concurrency,
            poll_interval_ms: config.worker.poll_interval_ms,
            batch_size: config.worker.batch_size,
            lease_secs: config.worker.lease_secs,
        },
    ));
    let worker_handle = {
        let worker = worker.clone();
        tokio::spawn(async move {
            worker.run().await;
        })
    };
    info!("Delivery worker started");

    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(webhooks_router(state));

    let addr = config.bind_addr();
    info!(%addr, "Server listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    // Stop the worker and wait for in-flight deliveries to finish
    worker.shutdown();
    if let Err(e) = worker_handle.await {
        tracing::error!("Delivery worker task panicked: {e}");
    }
    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
