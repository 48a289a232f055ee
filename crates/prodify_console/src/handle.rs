//! Caller-side view of one submission.

use crate::OutputChannel;
use prodify_core::{GenerationStatus, OutputState};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

/// Handle returned by [`Console::submit`](crate::Console::submit).
///
/// Dropping the handle does not cancel the submission.
#[derive(Debug)]
pub struct GenerationHandle {
    output: Arc<OutputChannel>,
    submission: u64,
    task: AbortHandle,
}

impl GenerationHandle {
    pub(crate) fn new(output: Arc<OutputChannel>, submission: u64, task: AbortHandle) -> Self {
        Self {
            output,
            submission,
            task,
        }
    }

    /// Submission counter value of this generation.
    pub fn submission(&self) -> u64 {
        self.submission
    }

    /// Receiver of every published state. The receiver also observes later
    /// submissions; compare `submission` to tell them apart.
    pub fn subscribe(&self) -> watch::Receiver<OutputState> {
        self.output.subscribe()
    }

    /// Snapshot of the shared output state.
    pub fn state(&self) -> OutputState {
        self.output.snapshot()
    }

    /// Whether this submission still owns the output and has not finished.
    pub fn is_current(&self) -> bool {
        let state = self.output.snapshot();
        state.submission == self.submission && !state.is_finished()
    }

    /// Cancels this submission.
    ///
    /// The status becomes `Cancelled` before the driving task is aborted, so a
    /// response that resolves afterwards is discarded. Returns false if the
    /// submission had already finished or been superseded.
    pub fn cancel(&self) -> bool {
        let cancelled = self.output.cancel(self.submission);
        self.task.abort();
        debug!(submission = self.submission, cancelled, "Cancel requested");
        cancelled
    }

    /// Waits until this submission reaches a terminal state.
    ///
    /// If a newer submission takes over first, the last state observed for
    /// this one is returned with status `Cancelled`.
    pub async fn wait(&self) -> OutputState {
        let mut rx = self.output.subscribe();
        let mut last: Option<OutputState> = None;

        loop {
            {
                let state = rx.borrow_and_update();
                if state.submission == self.submission {
                    if state.is_finished() {
                        return state.clone();
                    }
                    last = Some(state.clone());
                } else {
                    break;
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }

        let mut state = last.unwrap_or_else(|| OutputState::submitting(self.submission));
        state.status = GenerationStatus::Cancelled;
        state
    }

    /// Runs `callback` on every state published for this submission, in order,
    /// until it finishes or is superseded.
    ///
    /// Updates published faster than the callback runs are coalesced; the
    /// callback always sees the latest state, and the text it sees only grows.
    pub fn on_update<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(&OutputState) + Send + 'static,
    {
        let mut rx = self.output.subscribe();
        let submission = self.submission;

        tokio::spawn(async move {
            loop {
                let state = rx.borrow_and_update().clone();
                if state.submission != submission {
                    break;
                }
                callback(&state);
                if state.is_finished() || rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
