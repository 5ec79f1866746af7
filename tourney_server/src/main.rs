//! Tournament engine HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use pico_args::Arguments;
use tourney::TournamentEngine;
use tourney::store::{Database, PgStore};
use tracing::info;

use tourney_server::api::{self, AppState};
use tourney_server::config::ServerConfig;
use tourney_server::logging;

const HELP: &str = "\
Run the tournament structure server

USAGE:
  tourney_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:4444]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Connection pool upper bound  [default: 20]
  RUST_LOG                 Log filter (e.g., debug, tourney=debug)
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url_override: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind_override, database_url_override)?;

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("failed to connect to database")?;
    let pool = Arc::new(db.pool().clone());

    let store = Arc::new(PgStore::new(db.pool().clone()));
    let engine = Arc::new(TournamentEngine::new(store));

    let state = AppState { engine, pool };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind))?;
    info!("Server is running at http://{}. Press Ctrl+C to stop.", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install CTRL+C signal handler: {err}");
    }
}
