//! Status command handler.

use prodify_console::{GenerationBackend, ProdifyClient};
use prodify_error::{ConsoleError, ConsoleErrorKind, ProdifyResult};

/// Handle the `status` command: print one status response as JSON.
#[tracing::instrument(skip(client))]
pub async fn handle_status_command(client: &ProdifyClient, job_id: &str) -> ProdifyResult<()> {
    let response = client.job_status(job_id).await?;
    tracing::debug!(state = %response.state(), "Fetched job status");

    let rendered = serde_json::to_string_pretty(&response)
        .map_err(|e| ConsoleError::new(ConsoleErrorKind::ResponseParsing(e.to_string())))?;
    println!("{}", rendered);
    Ok(())
}
