//! EnvGuard - environmental sensor anomaly detection
//!
//! - `envguard edge`: live threshold alerts from MQTT
//! - `envguard batch`: statistical report over the last window

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use envguard_connectors::SqliteStore;
use envguard_core::{Clock, SystemClock};
use envguard_service::{
    report_outcome, run_edge, BatchArgs, BatchJob, EdgeArgs, NotifierArgs, StoreArgs,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// EnvGuard CLI
#[derive(Parser)]
#[command(name = "envguard")]
#[command(about = "Environmental sensor anomaly detection", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, used when RUST_LOG is unset
    #[arg(long, env = "ENVGUARD_LOG", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "ENVGUARD_LOG_JSON", global = true)]
    log_json: bool,

    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    notifier: NotifierArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consume live readings and alert on out-of-bounds values
    Edge(EdgeArgs),
    /// Analyze the trailing window and send a report
    Batch(BatchArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.log_json {
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

    let store = Arc::new(
        SqliteStore::open(&cli.store.store_path)
            .with_context(|| format!("opening store {}", cli.store.store_path.display()))?,
    );
    let notifier = cli.notifier.build()?;

    match cli.command {
        Command::Edge(args) => {
            let settings = args.settings()?;
            let mqtt = args.mqtt_config()?;

            tokio::select! {
                result = run_edge(settings, mqtt, store.clone(), store, notifier) => {
                    result?;
                    tracing::warn!("edge subscription ended");
                }
                _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
            }
        }
        Command::Batch(args) => {
            let settings = args.settings()?;
            let interval = settings.interval;
            let mut job = BatchJob::new(settings, store, notifier)?;

            match interval {
                Some(every) => {
                    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
                    tokio::select! {
                        _ = job.run_every(clock, every) => {}
                        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
                    }
                }
                None => {
                    let outcome = job.run_once(SystemClock.now()).await;
                    report_outcome(&outcome);
                    match outcome {
                        Err(e) if !e.is_missing_data() => return Err(e.into()),
                        _ => {}
                    }
                }
            }
        }
    }

    Ok(())
}
