//! tally-agent: remote worker that pulls arithmetic tasks from the orchestrator.

mod client;
mod evaluate;
mod worker;

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::client::OrchestratorClient;

#[derive(Parser, Debug)]
#[command(name = "tally-agent", version, about)]
struct Cli {
    /// Orchestrator base URL.
    #[arg(long, env = "ORCHESTRATOR_URL")]
    orchestrator_url: Option<String>,

    /// Number of concurrent workers.
    #[arg(long, env = "COMPUTING_POWER")]
    computing_power: Option<u32>,

    /// Delay between polls when no task is available, in milliseconds.
    #[arg(long, env = "AGENT_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    tally_core::config::load_dotenv();
    let defaults = tally_core::Config::from_env().agent;
    let cli = Cli::parse();

    let url = cli.orchestrator_url.unwrap_or(defaults.orchestrator_url);
    let workers = cli.computing_power.unwrap_or(defaults.computing_power).max(1);
    let idle = Duration::from_millis(cli.poll_interval_ms.unwrap_or(defaults.poll_interval_ms).max(1));

    let client = OrchestratorClient::new(&url)?;
    info!(orchestrator = %url, workers, "Starting agent");

    let handles: Vec<_> = (1..=workers)
        .map(|n| tokio::spawn(worker::run(n, client.clone(), idle)))
        .collect();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
