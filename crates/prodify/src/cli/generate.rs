//! Generate command handler.

use super::GenerateArgs;
use prodify_console::{Console, ProdifyClient, PollPolicy};
use prodify_core::{GenerationRequest, GenerationStatus, OutputState};
use prodify_error::ProdifyResult;
use std::io::Write;
use std::process::ExitCode;

/// Handle the `generate` command.
///
/// Prints the output as it grows and reports status changes on stderr.
/// Ctrl-C cancels the submission. Exits non-zero unless the generation
/// completed.
#[tracing::instrument(skip_all, fields(model = %args.model, stream = args.stream))]
pub async fn handle_generate_command(
    client: ProdifyClient,
    poll_policy: PollPolicy,
    args: GenerateArgs,
) -> ProdifyResult<ExitCode> {
    let mut builder = GenerationRequest::builder();
    builder
        .model(args.model)
        .prompt(args.prompt)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .top_p(args.top_p);
    if args.stream {
        builder.stream(Some(true));
    }
    let request = builder.build()?;

    let console = Console::new(client, poll_policy);
    let handle = console.submit(request);
    let mut updates = handle.subscribe();
    let mut renderer = Renderer::default();

    let state = loop {
        let state = updates.borrow_and_update().clone();
        if state.submission == handle.submission() {
            renderer.render(&state)?;
            if state.is_finished() {
                break state;
            }
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break handle.wait().await;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, cancelling generation");
                handle.cancel();
            }
        }
    };

    renderer.finish(&state)?;
    tracing::info!(status = %state.status, revision = state.revision, "Generation finished");

    match state.status {
        GenerationStatus::Completed => Ok(ExitCode::SUCCESS),
        GenerationStatus::Cancelled => Ok(ExitCode::from(130)),
        _ => Ok(ExitCode::FAILURE),
    }
}

/// Writes only what changed since the previous state.
#[derive(Debug, Default)]
struct Renderer {
    printed: String,
    status: Option<GenerationStatus>,
}

impl Renderer {
    fn render(&mut self, state: &OutputState) -> std::io::Result<()> {
        if self.status.as_ref() != Some(&state.status) && !state.status.is_terminal() {
            match &state.job_id {
                Some(job_id) => eprintln!("[{}] job {}", state.status, job_id),
                None => eprintln!("[{}]", state.status),
            }
            self.status = Some(state.status.clone());
        }

        let mut stdout = std::io::stdout().lock();
        match state.text.strip_prefix(self.printed.as_str()) {
            Some(grown) => stdout.write_all(grown.as_bytes())?,
            None => {
                // Output was replaced rather than extended, e.g. by a failure message.
                writeln!(stdout)?;
                stdout.write_all(state.text.as_bytes())?;
            }
        }
        stdout.flush()?;
        self.printed.clone_from(&state.text);
        Ok(())
    }

    fn finish(&mut self, state: &OutputState) -> std::io::Result<()> {
        if !self.printed.is_empty() {
            println!();
        }
        match (&state.status, &state.error) {
            (GenerationStatus::Failed, Some(error)) => eprintln!("[failed] {}", error),
            (status, _) => eprintln!("[{}]", status),
        }
        Ok(())
    }
}
