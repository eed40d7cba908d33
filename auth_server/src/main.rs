//! Credential service for the forum backend.
//!
//! Serves register/login/refresh/logout over HTTP, backed by PostgreSQL or,
//! with `--in-memory`, by a process-local store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use auth_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics, purge,
};
use forum_auth::{
    Database, MemoryCredentialStore, PgCredentialStore, SessionManager,
    db::RefreshTokenRepository,
};
use pico_args::Arguments;

const HELP: &str = "\
Run the forum credential service

USAGE:
  auth_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8081]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  --in-memory              Keep users and tokens in process memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  ACCESS_TOKEN_SECRET      Access-token signing secret (required, >= 32 chars)
  REFRESH_TOKEN_SECRET     Refresh-token digest secret (required, >= 32 chars)
  PASSWORD_PEPPER          Password hashing pepper
  ACCESS_TOKEN_TTL_HOURS   Access-token lifetime [default: 24]
  REFRESH_TOKEN_TTL_HOURS  Refresh-token lifetime [default: 720]
  CORS_ALLOWED_ORIGINS     Comma-separated origins [default: http://localhost:3000]
  METRICS_BIND             Prometheus listener address (disabled when unset)
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        in_memory: pargs.contains("--in-memory"),
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).context("Failed to install Prometheus exporter")?;
        tracing::info!("Prometheus metrics listening on {}", addr);
    }

    let (sessions, token_store, database): (
        SessionManager,
        Arc<dyn RefreshTokenRepository>,
        Option<Database>,
    ) = if args.in_memory {
        tracing::warn!("Using the in-memory credential store; all data is lost on exit");
        let store = Arc::new(MemoryCredentialStore::new());
        let sessions = SessionManager::with_store(store.clone(), config.auth_config())?;
        (sessions, store as Arc<dyn RefreshTokenRepository>, None)
    } else {
        tracing::info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.migrate().await.context("Failed to run migrations")?;
        tracing::info!("Database connected successfully");

        let store = Arc::new(PgCredentialStore::new(db.pool().clone()));
        let sessions = SessionManager::with_store(store.clone(), config.auth_config())?;
        (sessions, store as Arc<dyn RefreshTokenRepository>, Some(db))
    };

    let purge_task = purge::spawn_purge_task(
        token_store,
        Duration::from_secs(config.token_purge_interval_secs),
    );

    let state = AppState {
        sessions: Arc::new(sessions),
        database: database.clone(),
    };
    let app = api::create_router(state, api::cors_layer(&config.cors_allowed_origins));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down server...");
    purge_task.abort();
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
