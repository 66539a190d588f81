use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedwatch::app::AppContext;
use feedwatch::cli::{commands, Cli, Commands, DaemonAction};
use feedwatch::config::Config;
use feedwatch::daemon::{daemon_status, stop_daemon, Daemon, DaemonConfig};

fn load_context(config_path: Option<&Path>) -> anyhow::Result<AppContext> {
    let config = Config::load(config_path)?;
    Ok(AppContext::new(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run => {
            let ctx = load_context(config_path)?;
            commands::run_once(&ctx).await?;
        }
        Commands::Ledger => {
            let ctx = load_context(config_path)?;
            commands::list_ledger(&ctx).await?;
        }
        Commands::Daemon { action } => match action {
            DaemonAction::Start {
                interval,
                no_initial_run,
            } => {
                let daemon_config = DaemonConfig {
                    interval_secs: DaemonConfig::parse_interval(&interval)
                        .map_err(anyhow::Error::msg)?,
                    run_on_start: !no_initial_run,
                };
                let ctx = load_context(config_path)?;
                Daemon::new(Arc::new(ctx), daemon_config).run().await?;
            }
            DaemonAction::Stop => {
                stop_daemon().map_err(anyhow::Error::msg)?;
                println!("Daemon stopped");
            }
            DaemonAction::Status => {
                println!("{}", daemon_status());
            }
        },
    }

    Ok(())
}
