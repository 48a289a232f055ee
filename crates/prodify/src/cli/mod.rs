//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the prodify binary.

mod commands;
mod generate;
mod health;
mod models;
mod status;

pub use commands::{Cli, Commands, GenerateArgs};
pub use generate::handle_generate_command;
pub use health::handle_health_command;
pub use models::handle_models_command;
pub use status::handle_status_command;
