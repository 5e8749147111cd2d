//! asientod - Asiento bookkeeping daemon
//!
//! Serves the REST API and, when enabled, generates due recurring
//! transactions in the background.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use asiento_service::config::ServiceConfig;
use asiento_service::{build_router, ServiceState};
use asiento_storage::StorageConfig;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "asientod", version, about = "Asiento bookkeeping REST service")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "ASIENTO_CONFIG")]
    config: Option<PathBuf>,

    /// Socket address to bind, e.g. 127.0.0.1:8092
    #[arg(short, long, env = "ASIENTO_LISTEN_ADDR")]
    listen: Option<SocketAddr>,

    /// Persist the store to this JSON snapshot file
    #[arg(long, env = "ASIENTO_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Accepted bearer tokens, comma separated
    #[arg(long, env = "ASIENTO_ACCESS_TOKENS", value_delimiter = ',')]
    tokens: Vec<String>,

    /// Log filter, e.g. `asiento_core=debug,info`
    #[arg(long, env = "ASIENTO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ASIENTO_LOG_JSON")]
    json: bool,
}

impl Cli {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(listen) = self.listen {
            config.server.listen_addr = listen;
        }
        if let Some(path) = self.snapshot {
            config.storage = StorageConfig::Snapshot { path };
        }
        if !self.tokens.is_empty() {
            config.access.tokens = self.tokens;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.json {
            config.logging.json = true;
        }
    }
}

fn init_tracing(config: &ServiceConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn spawn_recurring_scheduler(state: ServiceState, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let today = Utc::now().date_naive();
            match state.engine.run_recurring(today, None).await {
                Ok(summary) if !summary.created.is_empty() || !summary.errors.is_empty() => info!(
                    created = summary.created.len(),
                    held = summary.awaiting_decision.len(),
                    errors = summary.errors.len(),
                    "Recurring transactions processed"
                ),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "Recurring run failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    init_tracing(&config);

    let state = ServiceState::bootstrap(&config).context("failed to start engine")?;
    if config.scheduler.recurring_enabled {
        let every = Duration::from_secs(config.scheduler.recurring_interval_secs.max(60));
        spawn_recurring_scheduler(state.clone(), every);
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.server.listen_addr))?;
    info!(
        addr = %listener.local_addr()?,
        storage = ?config.storage,
        "asiento-service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Cannot listen for shutdown signal");
            }
        })
        .await?;

    info!("asiento-service stopped");
    Ok(())
}
