//! Prodify command-line console.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use prodify_console::{ConfigOverrides, ConsoleConfig, ProdifyClient};
use prodify_error::ProdifyResult;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env before parsing so env-backed flags see it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    prodify_core::init_tracing("warn")?;
    #[cfg(feature = "observability")]
    prodify_core::init_observability("prodify", 60)?;

    let outcome = run(cli).await;

    #[cfg(feature = "observability")]
    prodify_core::shutdown_observability()?;

    Ok(outcome?)
}

async fn run(cli: Cli) -> ProdifyResult<ExitCode> {
    let config = ConsoleConfig::load_with(
        cli.config.as_deref(),
        ConfigOverrides {
            base_url: cli.base_url,
            api_key: cli.api_key,
        },
    )?;
    tracing::debug!(base_url = %config.base_url(), "Configuration loaded");
    let client = ProdifyClient::new(&config)?;

    let code = match cli.command {
        Commands::Models => {
            cli::handle_models_command(&client).await?;
            ExitCode::SUCCESS
        }
        Commands::Generate(args) => {
            cli::handle_generate_command(client, config.poll_policy(), args).await?
        }
        Commands::Status { job_id } => {
            cli::handle_status_command(&client, &job_id).await?;
            ExitCode::SUCCESS
        }
        Commands::Health => cli::handle_health_command(&client).await?,
    };
    Ok(code)
}
