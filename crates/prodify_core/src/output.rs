//! The single observable state a UI renders while a generation is in flight.

use serde::{Deserialize, Serialize};

/// Visible status of the current submission.
///
/// Terminal states are `Completed`, `Failed` and `Cancelled`; nothing moves a
/// submission out of a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display)]
#[serde(tag = "state", content = "label", rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Nothing submitted yet
    #[default]
    #[display("idle")]
    Idle,
    /// Submission request sent, response not yet classified
    #[display("submitting")]
    Submitting,
    /// Consuming an incremental response body
    #[display("streaming")]
    Streaming,
    /// Job accepted, waiting for a worker
    #[display("queued")]
    Queued,
    /// Job in progress; carries the server's label (e.g. `processing`)
    #[display("{_0}")]
    Running(String),
    /// Generation finished
    #[display("completed")]
    Completed,
    /// Generation failed; partial text, if any, is kept
    #[display("failed")]
    Failed,
    /// Caller cancelled or superseded the submission
    #[display("cancelled")]
    Cancelled,
}

impl GenerationStatus {
    /// Returns true for `Completed`, `Failed` and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationStatus::Completed | GenerationStatus::Failed | GenerationStatus::Cancelled
        )
    }

    /// Position in the submission lifecycle. Statuses only ever move to an
    /// equal or higher rank.
    pub fn rank(&self) -> u8 {
        match self {
            GenerationStatus::Idle => 0,
            GenerationStatus::Submitting => 1,
            GenerationStatus::Streaming | GenerationStatus::Queued => 2,
            GenerationStatus::Running(_) => 3,
            GenerationStatus::Completed | GenerationStatus::Failed | GenerationStatus::Cancelled => 4,
        }
    }

    /// Whether moving from `self` to `next` respects the forward-only lifecycle.
    pub fn can_advance_to(&self, next: &GenerationStatus) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

/// What the UI observes for the current submission.
///
/// Owned by whichever consumption strategy is active; every change is
/// published as a complete snapshot, never as a delta.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputState {
    /// Submission counter value this state belongs to
    pub submission: u64,
    /// Full accumulated output text
    pub text: String,
    /// Current lifecycle status
    pub status: GenerationStatus,
    /// Server job identifier when the polled strategy is active
    pub job_id: Option<String>,
    /// Terminal error description, if the submission failed
    pub error: Option<String>,
    /// Number of publishes applied to this submission
    pub revision: u64,
}

impl OutputState {
    /// Fresh state for a newly started submission.
    pub fn submitting(submission: u64) -> Self {
        Self {
            submission,
            status: GenerationStatus::Submitting,
            ..Self::default()
        }
    }

    /// Whether the submission has reached a terminal status.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_displays_server_label() {
        assert_eq!(GenerationStatus::Running("processing".into()).to_string(), "processing");
        assert_eq!(GenerationStatus::Queued.to_string(), "queued");
    }

    #[test]
    fn lifecycle_is_forward_only() {
        let running = GenerationStatus::Running("processing".into());
        assert!(GenerationStatus::Queued.can_advance_to(&running));
        assert!(running.can_advance_to(&GenerationStatus::Running("started".into())));
        assert!(!running.can_advance_to(&GenerationStatus::Queued));
        assert!(!GenerationStatus::Completed.can_advance_to(&GenerationStatus::Failed));
    }

    #[test]
    fn submitting_state_is_blank() {
        let state = OutputState::submitting(7);
        assert_eq!(state.submission, 7);
        assert!(state.text.is_empty());
        assert_eq!(state.status, GenerationStatus::Submitting);
        assert!(!state.is_finished());
    }
}
