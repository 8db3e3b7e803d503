use anyhow::{Context, Result};
use cadence_auth::{Authenticator, SessionEvent};
use cadence_config::AppConfig;
use cadence_database::initialize_database;
use cadence_workflow::WorkflowClient;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub workflow: WorkflowClient,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let authenticator = Authenticator::new(db_pool.clone(), config.auth.clone());
        if !authenticator.identity_enabled() {
            tracing::warn!("identity provider credentials missing, login is disabled");
        }

        let workflow =
            WorkflowClient::new(&config.backend).context("failed to build workflow client")?;
        info!(backend = %workflow.base_url(), "workflow backend configured");

        Ok(Self {
            db_pool,
            authenticator,
            workflow,
        })
    }
}

/// Logs every session change until the authenticator goes away or the
/// returned handle is aborted.
pub fn spawn_session_logger(authenticator: &Authenticator) -> JoinHandle<()> {
    let mut subscription = authenticator.subscribe();
    tokio::spawn(async move {
        while let Some(event) = subscription.next().await {
            match event {
                SessionEvent::SignedIn { user_id } => info!(user_id, "session opened"),
                SessionEvent::Refreshed { user_id } => info!(user_id, "session refreshed"),
                SessionEvent::SignedOut { user_id } => info!(user_id, "session closed"),
            }
        }
    })
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
