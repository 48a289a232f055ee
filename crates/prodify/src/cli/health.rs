//! Health command handler.

use prodify_console::ProdifyClient;
use prodify_error::ProdifyResult;
use std::process::ExitCode;

/// Handle the `health` command.
///
/// Exits non-zero unless the gateway is both alive and ready.
#[tracing::instrument(skip_all)]
pub async fn handle_health_command(client: &ProdifyClient) -> ProdifyResult<ExitCode> {
    let alive = client.health().await?;
    println!("alive: {}", alive);

    let readiness = client.readiness().await?;
    match (readiness.models(), readiness.error()) {
        (Some(models), _) => println!("ready: {} ({} models)", readiness.ready(), models),
        (None, Some(error)) => println!("ready: {} ({})", readiness.ready(), error),
        (None, None) => println!("ready: {}", readiness.ready()),
    }

    if alive && *readiness.ready() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
