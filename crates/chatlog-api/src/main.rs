//! chatlog CLI entry point.
//!
//! Binary name: `chatlog`
//!
//! Parses CLI arguments, opens the store (running index initialization when
//! configured), then dispatches one command.

mod cli;
mod state;

use clap::Parser;

use chatlog_observe::tracing_setup::{init_tracing, shutdown_tracing};
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_directives(), cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let state = AppState::init().await?;
    tracing::debug!(data_dir = %state.data_dir.display(), "store opened");

    match cli.command {
        Commands::Init => cli::indexes::init(&state, cli.json).await?,
        Commands::Append {
            conversation,
            role,
            texts,
        } => cli::messages::append(&state, &conversation, role, texts, cli.json).await?,
        Commands::Recent {
            conversation,
            limit,
        } => cli::messages::recent(&state, &conversation, limit, cli.json).await?,
        Commands::Clear { conversation } => {
            cli::messages::clear(&state, &conversation, cli.json).await?
        }
        Commands::Purge => cli::indexes::purge(&state, cli.json).await?,
        Commands::Watch { interval } => cli::indexes::watch(&state, interval).await?,
    }

    Ok(())
}
