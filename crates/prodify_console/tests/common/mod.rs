//! Shared fixtures for console integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use prodify_console::{
    ConsoleConfig, GenerationBackend, PollPolicy, ProdifyClient, SubmissionResponse,
};
use prodify_core::{GenerationRequest, JobStatusResponse};
use prodify_error::{ConsoleError, ConsoleErrorKind};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};

/// Interval short enough to keep polling tests fast.
pub const FAST_POLL: Duration = Duration::from_millis(10);

pub fn fast_policy() -> PollPolicy {
    PollPolicy::every(FAST_POLL)
}

pub fn request(model: &str) -> GenerationRequest {
    GenerationRequest::new(model, "Once upon a time in Bangalore,", 120).expect("valid request")
}

pub fn client_for(uri: &str) -> ProdifyClient {
    let config = ConsoleConfig::builder()
        .base_url(uri)
        .api_key("test-key")
        .request_timeout(Duration::from_secs(5))
        .poll_interval(FAST_POLL)
        .build()
        .expect("valid config");
    ProdifyClient::new(&config).expect("client")
}

/// One scripted answer to a status request.
pub enum StatusStep {
    /// Answer immediately
    Reply(JobStatusResponse),
    /// Answer once the paired sender fires
    Gated(oneshot::Receiver<JobStatusResponse>),
    /// Fail immediately
    Error(ConsoleErrorKind),
}

/// Backend answering from a script instead of the network.
pub struct ScriptedBackend {
    submission: Mutex<Option<SubmissionResponse>>,
    steps: Mutex<VecDeque<StatusStep>>,
    polls: AtomicUsize,
    poll_started: Arc<Notify>,
}

impl ScriptedBackend {
    pub fn new(submission: SubmissionResponse, steps: Vec<StatusStep>) -> Self {
        Self {
            submission: Mutex::new(Some(submission)),
            steps: Mutex::new(steps.into()),
            polls: AtomicUsize::new(0),
            poll_started: Arc::new(Notify::new()),
        }
    }

    /// Backend whose submission returns `{"job_id": id}`.
    pub fn job(id: &str, steps: Vec<StatusStep>) -> Self {
        let body = serde_json::json!({ "job_id": id, "status": "queued" }).to_string();
        Self::new(
            SubmissionResponse::from_bytes(Some("application/json"), body),
            steps,
        )
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Signalled every time a status request starts.
    pub fn poll_started(&self) -> Arc<Notify> {
        Arc::clone(&self.poll_started)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn submit(&self, _request: &GenerationRequest) -> Result<SubmissionResponse, ConsoleError> {
        self.submission.lock().take().ok_or_else(|| {
            ConsoleError::new(ConsoleErrorKind::Http("already submitted".into()))
        })
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobStatusResponse, ConsoleError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front();
        self.poll_started.notify_one();
        match step {
            Some(StatusStep::Reply(response)) => Ok(response),
            Some(StatusStep::Gated(rx)) => rx
                .await
                .map_err(|_| ConsoleError::new(ConsoleErrorKind::Http("gate dropped".into()))),
            Some(StatusStep::Error(kind)) => Err(ConsoleError::new(kind)),
            None => Ok(JobStatusResponse::new("processing", None, None)),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ConsoleError> {
        Ok(vec!["scripted".to_string()])
    }
}

/// NDJSON submission response delivered in the given chunks.
pub fn ndjson(chunks: &[&'static str]) -> SubmissionResponse {
    SubmissionResponse::from_chunks(
        Some("application/x-ndjson"),
        chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect::<Vec<_>>(),
    )
}
