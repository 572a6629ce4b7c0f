//! pkgmatrix CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;

use commands::Commands;
use config::AppConfig;
use pkgmatrix_scheduler::TriggerMetrics;

#[derive(Parser)]
#[command(name = "pkgmatrix")]
#[command(author, version, about = "Build matrix reconciliation and trigger scheduler", long_about = None)]
struct Cli {
    /// Configuration file (TOML or YAML)
    #[arg(short, long, global = true, env = "PKGMATRIX_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pkgmatrix=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = AppConfig::load(cli.config.as_deref())?;
    let metrics = TriggerMetrics::new();

    let result = match cli.command {
        Commands::Reconcile => handlers::reconcile(&config, metrics.clone()).await,
        Commands::Trigger { limit, ids } => {
            handlers::trigger(&config, metrics.clone(), limit, &ids).await
        }
        Commands::Trim => handlers::trim(&config).await,
        Commands::Missing { package_id } => handlers::missing(&config, &package_id).await,
        Commands::Run => handlers::run(&config, metrics.clone()).await,
        Commands::Migrate => handlers::migrate(&config).await,
    };

    tracing::info!(metrics = ?metrics.snapshot(), "Metrics");
    result
}
