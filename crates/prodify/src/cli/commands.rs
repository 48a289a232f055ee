//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Console for the Prodify inference gateway.
#[derive(Debug, Parser)]
#[command(name = "prodify", version, about)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Gateway base URL (overrides configuration)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Gateway API key (overrides configuration)
    #[arg(long, global = true, env = "PRODIFY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the models the gateway can serve
    Models,

    /// Submit a prompt and render the output as it arrives
    Generate(GenerateArgs),

    /// Fetch the current status of a job
    Status {
        /// Job identifier returned by a submission
        job_id: String,
    },

    /// Check gateway liveness and readiness
    Health,
}

/// Arguments of the `generate` subcommand.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Model name, as listed by `prodify models`
    #[arg(short, long)]
    pub model: String,

    /// Prompt text
    #[arg(short, long)]
    pub prompt: String,

    /// Token budget; snapped to a multiple of 10 within 10..=500
    #[arg(long, default_value_t = prodify_core::DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Sampling temperature (0.0 to 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold (0.0 exclusive to 1.0)
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Ask the gateway for an incremental response
    #[arg(long)]
    pub stream: bool,
}
