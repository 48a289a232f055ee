//! Models command handler.

use prodify_console::{GenerationBackend, ProdifyClient};
use prodify_error::ProdifyResult;

/// Handle the `models` command: print one model name per line.
#[tracing::instrument(skip_all)]
pub async fn handle_models_command(client: &ProdifyClient) -> ProdifyResult<()> {
    let models = client.list_models().await?;
    tracing::info!(count = models.len(), "Fetched models");

    if models.is_empty() {
        eprintln!("No models available");
    }
    for model in models {
        println!("{}", model);
    }
    Ok(())
}
