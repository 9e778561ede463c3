//! Arbitration Agent
//!
//! Main entry point for the unattended arbitration agent.
//! Runs as a user (files challenges against unreimbursed transfers) or as a
//! maker (answers challenges against its own transfers). Records and
//! configuration live in the data directory and survive restarts.

use anyhow::{bail, Result};
use arbitration_client::HttpConnector;
use arbitration_engine::{
    ArbitrationStore, ChainRelationCache, ConfigManager, EngineContext, LifecycleConfig,
    LifecycleCoordinator, Scheduler, SchedulerConfig, SystemClock,
};
use arbitration_types::Role;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod status_server;

use config::ConfigArgs;
use status_server::{StatusContext, StatusServer};

/// Agent mode
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Challenge unreimbursed transfers and prove the source transaction
    User,
    /// Answer challenges against the configured makers
    Maker,
}

impl From<Mode> for Role {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::User => Role::User,
            Mode::Maker => Role::Maker,
        }
    }
}

/// Cross-chain transfer arbitration agent
#[derive(Parser, Debug)]
#[command(name = "arbitration-agent")]
#[command(about = "Unattended arbitration agent for cross-chain transfer disputes", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Data directory for records and the keystore
    #[arg(long, env = "ARBITRATION_DATA_DIR", default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Password of the wallet keystore
    #[arg(long, env = "ARBITRATION_SECRET_KEY", hide_env_values = true, global = true)]
    secret_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until Ctrl+C
    Run(RunArgs),
    /// Persist configuration changes and exit
    Configure(ConfigArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Which side of the dispute to act for
    #[arg(long, value_enum)]
    mode: Mode,

    /// Status HTTP bind address
    #[arg(long, default_value = "127.0.0.1:8790")]
    status_addr: String,

    /// Seconds between discovery passes
    #[arg(long, default_value = "30")]
    discovery_interval_secs: u64,

    /// Seconds between proof-sync passes
    #[arg(long, default_value = "40")]
    proof_interval_secs: u64,

    /// Pause after each processed item, in milliseconds
    #[arg(long, default_value = "3000")]
    item_delay_ms: u64,

    /// In-memory overrides, not persisted
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    std::fs::create_dir_all(&cli.data_dir)?;
    let store = Arc::new(ArbitrationStore::open(cli.data_dir.join("db"))?);
    let config = Arc::new(ConfigManager::load(
        store.clone(),
        keystore_dir(&cli.data_dir),
        cli.secret_key.clone(),
    )?);

    match cli.command {
        Command::Run(args) => run(args, store, config).await,
        Command::Configure(args) => configure(args, &config),
    }
}

fn keystore_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("keystore")
}

/// Apply a persistent configuration change
fn configure(args: ConfigArgs, config: &ConfigManager) -> Result<()> {
    let update = args.into_update();
    if update.is_empty() {
        bail!("nothing to configure; pass at least one setting");
    }

    let snapshot = config.update(update)?;
    tracing::info!(
        "Saved configuration: rpc={:?} coordinator={:?} subgraph={:?} makers={}",
        snapshot.rpc_url,
        snapshot.coordinator_url,
        snapshot.subgraph_url,
        snapshot.maker_list.len()
    );
    Ok(())
}

/// Run the agent until Ctrl+C
async fn run(args: RunArgs, store: Arc<ArbitrationStore>, config: Arc<ConfigManager>) -> Result<()> {
    let role = Role::from(args.mode);

    let overrides = args.config.into_update();
    if !overrides.is_empty() {
        config.overlay(&overrides)?;
    }

    let snapshot = config.snapshot();
    if role == Role::Maker && snapshot.maker_list.is_empty() {
        bail!("maker mode requires at least one maker address (--makers or ARBITRATION_MAKERS)");
    }

    tracing::info!("Starting arbitration agent - {} MODE", role.to_string().to_uppercase());
    tracing::info!("  Status endpoint: {}", args.status_addr);
    if role == Role::Maker {
        tracing::info!("  Makers: {}", snapshot.maker_list.join(", "));
    }

    let engine = Arc::new(EngineContext {
        store: store.clone(),
        config,
        connector: Arc::new(HttpConnector),
        chain_relations: ChainRelationCache::default(),
        clock: Arc::new(SystemClock),
        settings: LifecycleConfig {
            item_delay: Duration::from_millis(args.item_delay_ms),
            ..Default::default()
        },
    });

    let coordinator = Arc::new(LifecycleCoordinator::new(engine, role));
    let scheduler = Arc::new(Scheduler::new(
        coordinator,
        SchedulerConfig {
            discovery_interval: Duration::from_secs(args.discovery_interval_secs.max(1)),
            proof_sync_interval: Duration::from_secs(args.proof_interval_secs.max(1)),
        },
    ));

    // Start status server
    let status_context = Arc::new(StatusContext {
        store: store.clone(),
        scheduler: scheduler.clone(),
        role,
    });
    let status_addr = args.status_addr.clone();
    let status_server = tokio::spawn(async move {
        if let Err(e) = StatusServer::new(status_context).run(&status_addr).await {
            tracing::error!("Status server error: {}", e);
        }
    });

    let scheduler_handle = tokio::spawn(scheduler.clone().run());

    tracing::info!("Agent running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    scheduler.stop();
    if let Err(e) = scheduler_handle.await {
        tracing::error!("Scheduler task failed: {}", e);
    }
    status_server.abort();

    if let Err(e) = store.flush() {
        tracing::error!("Failed to flush store: {}", e);
    }

    tracing::info!("Agent stopped");
    Ok(())
}
