//! Entry point tying routing, streaming and polling to one shared output.

use crate::{
    ConsoleMetrics, GenerationBackend, GenerationHandle, JobPoller, OutputChannel, PollPolicy,
    Publisher, Route, StreamAccumulator, route,
};
use parking_lot::Mutex;
use prodify_core::{GenerationRequest, OutputState};
use prodify_error::{ConsoleError, ConsoleErrorKind};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Runs generation submissions against a backend, one at a time.
///
/// Starting a submission supersedes the previous one: its counter value is
/// invalidated before the new one begins, and its task is aborted. Every
/// submission writes to the same [`OutputState`], observable through
/// [`subscribe`](Self::subscribe). A submission whose task panics ends as
/// `Failed`.
///
/// # Examples
///
/// ```no_run
/// use prodify_console::{Console, ConsoleConfig, ProdifyClient};
/// use prodify_core::GenerationRequest;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConsoleConfig::from_env()?;
/// let console = Console::new(ProdifyClient::new(&config)?, config.poll_policy());
///
/// let request = GenerationRequest::new("qwen3:0.6b", "Once upon a time,", 200)?;
/// let handle = console.submit(request);
/// let state = handle.wait().await;
/// println!("{}: {}", state.status, state.text);
/// # Ok(())
/// # }
/// ```
pub struct Console<B: ?Sized> {
    backend: Arc<B>,
    output: Arc<OutputChannel>,
    poll_policy: PollPolicy,
    metrics: ConsoleMetrics,
    active: Mutex<Option<AbortHandle>>,
}

impl<B> Console<B>
where
    B: GenerationBackend + 'static,
{
    /// Creates a console that owns `backend`.
    pub fn new(backend: B, poll_policy: PollPolicy) -> Self {
        Self::from_arc(Arc::new(backend), poll_policy)
    }
}

impl<B> Console<B>
where
    B: GenerationBackend + ?Sized + 'static,
{
    /// Creates a console over a shared backend.
    pub fn from_arc(backend: Arc<B>, poll_policy: PollPolicy) -> Self {
        Self {
            backend,
            output: Arc::new(OutputChannel::new()),
            poll_policy,
            metrics: ConsoleMetrics::new(),
            active: Mutex::new(None),
        }
    }

    /// Backend used for submissions.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Polling policy applied to job-oriented submissions.
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    /// Receiver of every published output state.
    pub fn subscribe(&self) -> watch::Receiver<OutputState> {
        self.output.subscribe()
    }

    /// Snapshot of the current output state.
    pub fn state(&self) -> OutputState {
        self.output.snapshot()
    }

    /// Model names the backend can serve.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the listing fails.
    pub async fn models(&self) -> Result<Vec<String>, ConsoleError> {
        self.backend.list_models().await
    }

    /// Starts a submission, superseding any submission still in flight.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: GenerationRequest) -> GenerationHandle {
        let mut active = self.active.lock();

        let submission = self.output.begin();
        if let Some(previous) = active.take() {
            debug!(submission, "Superseding previous submission");
            previous.abort();
        }

        let publisher = Publisher::new(Arc::clone(&self.output), submission, self.metrics.clone());
        let span = info_span!("generation", submission, model = %request.model());
        let worker = tokio::spawn(
            drive(
                Arc::clone(&self.backend),
                request,
                publisher.clone(),
                self.poll_policy.clone(),
            )
            .instrument(span.clone()),
        );
        let task = worker.abort_handle();
        tokio::spawn(supervise(worker, publisher).instrument(span));

        *active = Some(task.clone());
        GenerationHandle::new(Arc::clone(&self.output), submission, task)
    }

    /// Builds a request from the three values a UI always supplies and
    /// submits it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the model is empty or the prompt is blank.
    pub fn submit_generation(
        &self,
        model: impl Into<String>,
        prompt: impl Into<String>,
        max_tokens: u32,
    ) -> Result<GenerationHandle, ConsoleError> {
        let request = GenerationRequest::new(model, prompt, max_tokens)?;
        Ok(self.submit(request))
    }

    /// Cancels whatever submission is in flight. Returns false if there was
    /// nothing to cancel.
    pub fn cancel_active(&self) -> bool {
        let mut active = self.active.lock();
        let submission = self.output.snapshot().submission;
        let cancelled = self.output.cancel(submission);
        if let Some(task) = active.take() {
            task.abort();
        }
        debug!(submission, cancelled, "Cancelled active submission");
        cancelled
    }
}

impl<B: ?Sized> std::fmt::Debug for Console<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("poll_policy", &self.poll_policy)
            .field("state", &self.output.snapshot())
            .finish_non_exhaustive()
    }
}

/// Ends a submission whose driving task panicked, so waiters see `Failed`.
async fn supervise(worker: JoinHandle<()>, publisher: Publisher) {
    let Err(join_error) = worker.await else {
        return;
    };
    if !join_error.is_panic() {
        return;
    }
    let reason = panic_reason(join_error.into_panic());
    error!(reason = %reason, "Submission task panicked");
    publisher.fail(
        Some(format!("Error generating text: {}", reason)),
        reason,
    );
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "task panicked".to_string(),
        },
    }
}

/// Drives one submission from request to terminal state.
async fn drive<B>(
    backend: Arc<B>,
    request: GenerationRequest,
    publisher: Publisher,
    poll_policy: PollPolicy,
) where
    B: GenerationBackend + ?Sized,
{
    let started = Instant::now();

    let routed = match backend.submit(&request).await {
        Ok(response) => route(response).await,
        Err(e) => Err(e),
    };
    let route = match routed {
        Ok(route) => route,
        Err(e) => {
            warn!(error = %e, "Submission failed");
            publisher.fail(
                Some(format!("Error generating text: {}", e.kind())),
                e.kind().to_string(),
            );
            record_outcome(&publisher, started);
            return;
        }
    };

    if !publisher.is_current() {
        debug!("Submission superseded before routing");
        return;
    }
    info!(route = %route.kind(), "Response routed");
    publisher.metrics().record_submission(route.kind().into());

    match route {
        Route::Stream(body) => {
            StreamAccumulator::new().run(body, &publisher).await;
        }
        Route::Synchronous(text) => {
            publisher.complete(text);
        }
        Route::Job(job_id) => {
            JobPoller::new(backend, poll_policy).run(job_id, &publisher).await;
        }
        Route::Malformed(reason) => {
            let kind = ConsoleErrorKind::Submission(reason);
            warn!(error = %kind, "Job response cannot be followed");
            publisher.fail(Some(kind.to_string()), kind.to_string());
        }
    }

    record_outcome(&publisher, started);
}

fn record_outcome(publisher: &Publisher, started: Instant) {
    let state = publisher.snapshot();
    if state.submission != publisher.submission() || !state.is_finished() {
        return;
    }
    info!(status = %state.status, revision = state.revision, "Submission finished");
    publisher
        .metrics()
        .record_outcome(&state.status, started.elapsed().as_secs_f64());
}
