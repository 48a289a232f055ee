//! Asynchronous job tracking types.

use crate::GenerationStatus;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text shown when a job completes without any generated text.
pub const NO_TEXT_PLACEHOLDER: &str = "(no text returned)";

/// Body returned by `GET /status/{job_id}`.
///
/// `result` is kept as raw JSON because the worker stores whatever the model
/// backend returned: usually `{"model", "text"}`, sometimes a full generation
/// record carrying `response` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct JobStatusResponse {
    /// Lowercase state name reported by the server
    status: String,
    /// Result payload, present once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error description, present once failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl JobStatusResponse {
    /// Creates a status response.
    pub fn new(status: impl Into<String>, result: Option<Value>, error: Option<String>) -> Self {
        Self {
            status: status.into(),
            result,
            error,
        }
    }

    /// Parsed job state.
    pub fn state(&self) -> JobState {
        JobState::from_label(&self.status)
    }

    /// Generated text from the result payload, if any non-empty text is present.
    pub fn result_text(&self) -> Option<&str> {
        let text = match self.result.as_ref()? {
            Value::String(text) => text.as_str(),
            value => value
                .get("text")
                .and_then(Value::as_str)
                .or_else(|| value.get("response").and_then(Value::as_str))?,
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Server-side job state as seen through polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum JobState {
    /// Waiting for a worker
    #[display("queued")]
    Queued,
    /// Any non-terminal label other than `queued`
    #[display("{_0}")]
    Running(String),
    /// Finished successfully
    #[display("completed")]
    Completed,
    /// Finished with an error
    #[display("failed")]
    Failed,
}

impl JobState {
    /// Parses a server status label. Unknown labels are intermediate states.
    ///
    /// # Examples
    ///
    /// ```
    /// use prodify_core::JobState;
    ///
    /// assert_eq!(JobState::from_label("completed"), JobState::Completed);
    /// assert_eq!(JobState::from_label("processing"), JobState::Running("processing".into()));
    /// ```
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "queued" => JobState::Queued,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            other => JobState::Running(other.to_string()),
        }
    }

    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Status shown to the UI for this job state.
    pub fn as_status(&self) -> GenerationStatus {
        match self {
            JobState::Queued => GenerationStatus::Queued,
            JobState::Running(label) => GenerationStatus::Running(label.clone()),
            JobState::Completed => GenerationStatus::Completed,
            JobState::Failed => GenerationStatus::Failed,
        }
    }
}

/// A job created by a successful submission.
///
/// Only poll responses change it; a new submission supersedes it locally.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Job {
    /// Opaque server identifier
    id: String,
    /// Last observed state
    state: JobState,
    /// Generated text once completed
    result: Option<String>,
    /// Server error once failed
    error: Option<String>,
}

impl Job {
    /// A job that has just been accepted.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Queued,
            result: None,
            error: None,
        }
    }

    /// Applies a poll response. Returns false when the response would move the
    /// job backwards or out of a terminal state; the job is then left as is.
    pub fn apply(&mut self, response: &JobStatusResponse) -> bool {
        let next = response.state();
        if !self.state.as_status().can_advance_to(&next.as_status()) {
            return false;
        }
        if next == JobState::Completed {
            self.result = response.result_text().map(str::to_string);
        }
        if next == JobState::Failed {
            self.error = response.error.clone();
        }
        self.state = next;
        true
    }
}
