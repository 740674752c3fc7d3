use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use alfred::agent::Agent;
use alfred::channels::repl::{self, StdoutMessenger};
use alfred::commands::CommandRegistry;
use alfred::config::Config;
use alfred::llm::OpenAiClient;

#[derive(Parser)]
#[command(name = "alfred", about = "Natural-language command bot", version)]
struct Cli {
    /// Env file to load before reading configuration.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Seconds between pending-action sweep passes (0 disables the sweeper).
    #[arg(long, default_value_t = 60)]
    sweep_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    tracing::info!(
        model = %config.llm.model,
        high = config.agent.thresholds.high,
        low = config.agent.thresholds.low,
        ttl_secs = config.agent.pending_ttl.as_secs(),
        "starting {}",
        config.agent.bot_name
    );

    let registry = Arc::new(CommandRegistry::with_builtins());
    let backend = Arc::new(OpenAiClient::new(&config.llm));
    let messenger = Arc::new(StdoutMessenger::new());
    let agent = Arc::new(Agent::new(
        registry,
        backend,
        messenger,
        config.agent.thresholds,
        config.agent.pending_ttl,
    ));

    if cli.sweep_interval > 0 {
        let agent = agent.clone();
        let period = Duration::from_secs(cli.sweep_interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let removed = agent.ledger().sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "swept expired pending actions");
                }
            }
        });
    }

    repl::run(agent, &config.agent.bot_name).await?;
    Ok(())
}
