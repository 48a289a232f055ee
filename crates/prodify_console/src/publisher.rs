//! Ownership of the shared [`OutputState`].
//!
//! The submission counter lives inside the watched state itself, so starting a
//! submission, cancelling it, and every strategy update all run under the
//! channel's write lock. A publish carrying an old counter value is dropped
//! atomically, even when the awaited response behind it arrived late.

use crate::ConsoleMetrics;
use prodify_core::{GenerationStatus, OutputState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Broadcasts the current [`OutputState`] to every observer.
#[derive(Debug)]
pub struct OutputChannel {
    tx: watch::Sender<OutputState>,
}

impl OutputChannel {
    /// Creates a channel holding an idle state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(OutputState::default());
        Self { tx }
    }

    /// Invalidates whatever submission is current and resets the state for a
    /// new one. Returns the new submission number.
    pub fn begin(&self) -> u64 {
        let mut submission = 0;
        self.tx.send_modify(|state| {
            submission = state.submission + 1;
            *state = OutputState::submitting(submission);
        });
        debug!(submission, "Output reset for new submission");
        submission
    }

    /// Marks `submission` as cancelled if it is still current and unfinished.
    pub fn cancel(&self, submission: u64) -> bool {
        self.tx.send_if_modified(|state| {
            if state.submission != submission || state.status.is_terminal() {
                return false;
            }
            state.status = GenerationStatus::Cancelled;
            state.revision += 1;
            true
        })
    }

    /// Snapshot of the current state.
    pub fn snapshot(&self) -> OutputState {
        self.tx.borrow().clone()
    }

    /// New observer of state changes.
    pub fn subscribe(&self) -> watch::Receiver<OutputState> {
        self.tx.subscribe()
    }
}

impl Default for OutputChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Write access to the output for one submission.
///
/// Every update is checked against the submission counter and the terminal
/// status under the channel lock; a rejected update returns `false` and the
/// caller must stop.
#[derive(Debug, Clone)]
pub struct Publisher {
    channel: Arc<OutputChannel>,
    submission: u64,
    metrics: ConsoleMetrics,
}

impl Publisher {
    /// Binds a publisher to `submission` on `channel`.
    pub fn new(channel: Arc<OutputChannel>, submission: u64, metrics: ConsoleMetrics) -> Self {
        Self {
            channel,
            submission,
            metrics,
        }
    }

    /// Submission this publisher writes for.
    pub fn submission(&self) -> u64 {
        self.submission
    }

    /// Instruments shared with the strategy driving this publisher.
    pub fn metrics(&self) -> &ConsoleMetrics {
        &self.metrics
    }

    /// Whether updates from this publisher would still be applied.
    pub fn is_current(&self) -> bool {
        let state = self.channel.tx.borrow();
        state.submission == self.submission && !state.status.is_terminal()
    }

    /// Applies `update` if this submission is still current and unfinished.
    pub fn publish(&self, update: impl FnOnce(&mut OutputState)) -> bool {
        let applied = self.channel.tx.send_if_modified(|state| {
            if state.submission != self.submission || state.status.is_terminal() {
                return false;
            }
            update(state);
            state.revision += 1;
            true
        });

        if applied {
            trace!(submission = self.submission, "Output published");
        } else {
            debug!(submission = self.submission, "Discarding stale update");
            self.metrics.record_stale();
        }
        applied
    }

    /// Moves to a non-terminal status.
    pub fn set_status(&self, status: GenerationStatus) -> bool {
        self.publish(|state| state.status = status)
    }

    /// Publishes the final text and marks the submission completed.
    pub fn complete(&self, text: String) -> bool {
        self.publish(|state| {
            state.text = text;
            state.status = GenerationStatus::Completed;
        })
    }

    /// Marks the submission failed. `text` replaces the output when given;
    /// otherwise the partial output is kept.
    pub fn fail(&self, text: Option<String>, error: String) -> bool {
        self.publish(|state| {
            if let Some(text) = text {
                state.text = text;
            }
            state.status = GenerationStatus::Failed;
            state.error = Some(error);
        })
    }

    /// Current state as this publisher would see it.
    pub fn snapshot(&self) -> OutputState {
        self.channel.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publisher(channel: &Arc<OutputChannel>) -> Publisher {
        let submission = channel.begin();
        Publisher::new(Arc::clone(channel), submission, ConsoleMetrics::new())
    }

    #[test]
    fn begin_resets_and_counts() {
        let channel = Arc::new(OutputChannel::new());
        let first = publisher(&channel);
        assert!(first.publish(|s| s.text = "partial".into()));
        let second = channel.begin();
        assert_eq!(second, first.submission() + 1);
        let state = channel.snapshot();
        assert_eq!(state.text, "");
        assert_eq!(state.status, GenerationStatus::Submitting);
        assert_eq!(state.revision, 0);
    }

    #[test]
    fn superseded_publisher_is_rejected() {
        let channel = Arc::new(OutputChannel::new());
        let old = publisher(&channel);
        let new = publisher(&channel);
        assert!(!old.is_current());
        assert!(!old.complete("late".into()));
        assert!(new.complete("fresh".into()));
        assert_eq!(channel.snapshot().text, "fresh");
    }

    #[test]
    fn terminal_state_is_final() {
        let channel = Arc::new(OutputChannel::new());
        let publisher = publisher(&channel);
        assert!(publisher.fail(None, "boom".into()));
        assert!(!publisher.set_status(GenerationStatus::Streaming));
        assert!(!channel.cancel(publisher.submission()));
        assert_eq!(channel.snapshot().status, GenerationStatus::Failed);
    }

    #[test]
    fn cancel_blocks_further_updates() {
        let channel = Arc::new(OutputChannel::new());
        let publisher = publisher(&channel);
        assert!(publisher.publish(|s| s.text = "Hel".into()));
        assert!(channel.cancel(publisher.submission()));
        assert!(!publisher.publish(|s| s.text = "Hello".into()));
        let state = channel.snapshot();
        assert_eq!(state.text, "Hel");
        assert_eq!(state.status, GenerationStatus::Cancelled);
        assert_eq!(state.revision, 2);
    }

    #[test]
    fn fail_keeps_partial_text_when_none_given() {
        let channel = Arc::new(OutputChannel::new());
        let publisher = publisher(&channel);
        publisher.publish(|s| s.text = "partial".into());
        publisher.fail(None, "Stream interrupted: reset".into());
        let state = channel.snapshot();
        assert_eq!(state.text, "partial");
        assert_eq!(state.error.as_deref(), Some("Stream interrupted: reset"));
    }
}
