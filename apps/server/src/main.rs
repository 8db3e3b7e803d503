use std::sync::Arc;

use anyhow::Context;
use cadence_config::{load as load_config, AppConfig};
use cadence_gateway::{build_router, AppState};
use cadence_runtime::{spawn_session_logger, telemetry, BackendServices};
use clap::{Parser, Subcommand};
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "cadence-server")]
#[command(about = "Cadence dashboard server (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Apply pending database migrations and list what is installed
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Migrate => migrate(config).await,
    }
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!("starting Cadence dashboard server");

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;
    let session_logger = spawn_session_logger(&services.authenticator);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let state = AppState::new(
        Arc::new(config),
        services.authenticator.clone(),
        services.workflow.clone(),
    );
    let app = build_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cadence_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    session_logger.abort();
    services.db_pool.close().await;
    info!("server shut down");
    Ok(())
}

async fn migrate(config: AppConfig) -> anyhow::Result<()> {
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let rows = sqlx::query(
        "SELECT version, description, success FROM _sqlx_migrations ORDER BY version ASC",
    )
    .fetch_all(&services.db_pool)
    .await
    .context("failed to read migration history")?;

    println!("{:<16} {:<40} {:<8}", "Version", "Description", "Applied");
    println!("{}", "-".repeat(64));
    for row in rows {
        let version: i64 = row.try_get("version")?;
        let description: String = row.try_get("description")?;
        let success: bool = row.try_get("success")?;
        println!("{version:<16} {description:<40} {success:<8}");
    }

    services.db_pool.close().await;
    Ok(())
}
