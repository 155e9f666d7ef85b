//! Fee Ledger - API Server Binary
//!
//! This binary starts the HTTP API server and the background overdue sweep.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin fee-ledger-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin fee-ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_JSON_LOGS` - Emit JSON log lines (default: false)
//! * `API_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! * `API_OVERDUE_SWEEP_INTERVAL_SECS` - Seconds between overdue sweeps, 0 to disable (default: 3600)
//! * `API_LEDGER__CURRENCY_SCALE`, `API_LEDGER__RECEIPT_PREFIX`, `API_LEDGER__TIMEZONE`, ... - Ledger settings

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::SystemClock;
use infra_db::adapters::{PostgresFeeStore, PostgresFeeTypeCatalog, PostgresStudentDirectory};
use infra_db::{create_pool, run_migrations, DatabaseConfig};
use interface_api::{config::ApiConfig, create_router, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, establishes the database
/// connection, starts the overdue sweep and serves HTTP until shutdown.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("Invalid API configuration")?;
    init_tracing(&config.log_level, config.json_logs);
    config.ledger.validate().context("Invalid ledger configuration")?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = config.ledger.timezone.name(),
        "Starting Fee Ledger API Server"
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone()).max_connections(config.database_max_connections),
    )
    .await
    .context("Database connection failed")?;
    run_migrations(&pool).await.context("Database migration failed")?;

    let state = AppState::new(
        Arc::new(PostgresFeeStore::new(pool.clone())),
        Arc::new(PostgresFeeTypeCatalog::new(pool.clone())),
        Arc::new(PostgresStudentDirectory::new(pool)),
        Arc::new(SystemClock::new(config.ledger.timezone)),
        config.clone(),
    );

    let sweeper = match config.overdue_sweep_interval() {
        Some(period) => {
            tracing::info!(interval_secs = period.as_secs(), "Overdue sweep scheduled");
            Some(tokio::spawn(state.overdue_sweeper().run_every(period)))
        }
        None => None,
    };

    let app = create_router(state).layer(TimeoutLayer::new(config.request_timeout()));

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
