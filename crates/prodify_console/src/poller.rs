//! Fixed-interval status polling for job-oriented submissions.

use crate::{GenerationBackend, Publisher};
use derive_builder::Builder;
use derive_getters::Getters;
use prodify_core::{GenerationStatus, Job, JobState, NO_TEXT_PLACEHOLDER};
use prodify_error::{ConsoleError, ConsoleErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, instrument, warn};

/// Default time between status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Shortest interval a policy will poll at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// When and for how long a job is polled.
///
/// Both bounds are off by default: a job is polled until it reaches a terminal
/// state or the submission is cancelled. The builder rejects a zero interval;
/// the plain constructors raise it to [`MIN_POLL_INTERVAL`].
///
/// # Examples
///
/// ```
/// use prodify_console::PollPolicy;
/// use std::time::Duration;
///
/// let policy = PollPolicy::builder()
///     .interval(Duration::from_millis(500))
///     .max_attempts(Some(20))
///     .build()
///     .unwrap();
///
/// assert_eq!(*policy.max_attempts(), Some(20));
/// assert_eq!(*policy.max_duration(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct PollPolicy {
    /// Time between status requests; the first request waits one interval
    #[builder(default = "DEFAULT_POLL_INTERVAL")]
    interval: Duration,
    /// Give up after this many status requests
    #[builder(default)]
    max_attempts: Option<u32>,
    /// Give up once this much time has passed since polling started
    #[builder(default)]
    max_duration: Option<Duration>,
}

impl PollPolicy {
    /// Creates a new builder for `PollPolicy`.
    pub fn builder() -> PollPolicyBuilder {
        PollPolicyBuilder::default()
    }

    /// Polling at `interval` with the given bounds.
    pub fn new(interval: Duration, max_attempts: Option<u32>, max_duration: Option<Duration>) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            max_attempts,
            max_duration,
        }
    }

    /// Unbounded polling at `interval`.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            ..Self::default()
        }
    }
}

impl PollPolicyBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.interval.is_some_and(|interval| interval.is_zero()) {
            return Err("poll interval must be positive".to_string());
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            max_duration: None,
        }
    }
}

/// How polling a job ended.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Job completed and its result was published
    Completed {
        /// Status requests issued
        attempts: u32,
    },
    /// Job failed on the server, or a status request failed permanently
    Failed {
        /// Status requests issued
        attempts: u32,
        /// Cause
        error: ConsoleError,
    },
    /// A polling bound was reached first
    TimedOut(ConsoleError),
    /// A newer submission or a cancellation took over the output
    Superseded {
        /// Status requests issued
        attempts: u32,
    },
}

/// Follows one job until it reaches a terminal state.
///
/// Status requests never overlap: the next tick is only awaited after the
/// previous request resolved, and ticks missed meanwhile are skipped. After
/// every suspension the publisher is checked, so a status that resolves after
/// cancellation is dropped.
#[derive(Debug)]
pub struct JobPoller<B: ?Sized> {
    backend: Arc<B>,
    policy: PollPolicy,
}

impl<B> JobPoller<B>
where
    B: GenerationBackend + ?Sized,
{
    /// Creates a poller over `backend`.
    pub fn new(backend: Arc<B>, policy: PollPolicy) -> Self {
        Self { backend, policy }
    }

    /// Polling policy in effect.
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Polls `job_id` until it finishes, publishing each status transition.
    #[instrument(skip(self, publisher), fields(submission = publisher.submission()))]
    pub async fn run(&self, job_id: String, publisher: &Publisher) -> PollOutcome {
        let mut job = Job::new(job_id.clone());
        let announced = publisher.publish(|state| {
            state.job_id = Some(job_id.clone());
            state.status = GenerationStatus::Queued;
        });
        if !announced {
            return PollOutcome::Superseded { attempts: 0 };
        }
        // A deserialized policy skips both constructors.
        let period = self.policy.interval.max(MIN_POLL_INTERVAL);
        info!(job_id = %job_id, interval_ms = period.as_millis() as u64, "Polling job");

        let started = Instant::now();
        let mut ticker = interval_at(started + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut attempts: u32 = 0;

        loop {
            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return self.time_out(attempts, started, publisher);
                }
            }

            ticker.tick().await;
            if !publisher.is_current() {
                debug!(attempts, "Poll superseded before request");
                return PollOutcome::Superseded { attempts };
            }
            if let Some(max) = self.policy.max_duration {
                if started.elapsed() >= max {
                    return self.time_out(attempts, started, publisher);
                }
            }

            attempts += 1;
            publisher.metrics().record_poll();
            let response = self.backend.job_status(&job_id).await;
            if !publisher.is_current() {
                debug!(attempts, "Discarding poll result for superseded submission");
                return PollOutcome::Superseded { attempts };
            }

            let response = match response {
                Ok(response) => response,
                Err(e) if e.kind().is_transient() => {
                    warn!(error = %e, attempts, "Status request failed, retrying on next tick");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, attempts, "Status request failed permanently");
                    let message = format!("Error checking job status: {}", e.kind());
                    if !publisher.fail(Some(message.clone()), message) {
                        return PollOutcome::Superseded { attempts };
                    }
                    return PollOutcome::Failed { attempts, error: e };
                }
            };

            if !job.apply(&response) {
                warn!(
                    current = %job.state(),
                    reported = %response.status(),
                    "Ignoring backward job transition"
                );
                continue;
            }
            debug!(attempts, state = %job.state(), "Job status");

            match job.state() {
                JobState::Completed => {
                    let text = job
                        .result()
                        .clone()
                        .unwrap_or_else(|| NO_TEXT_PLACEHOLDER.to_string());
                    if !publisher.complete(text) {
                        return PollOutcome::Superseded { attempts };
                    }
                    info!(attempts, "Job completed");
                    return PollOutcome::Completed { attempts };
                }
                JobState::Failed => {
                    let reason = job
                        .error()
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string());
                    if !publisher.fail(Some(format!("Generation failed: {}", reason)), reason.clone())
                    {
                        return PollOutcome::Superseded { attempts };
                    }
                    info!(attempts, reason = %reason, "Job failed");
                    return PollOutcome::Failed {
                        attempts,
                        error: ConsoleError::new(ConsoleErrorKind::JobFailed(reason)),
                    };
                }
                state => {
                    if !publisher.set_status(state.as_status()) {
                        return PollOutcome::Superseded { attempts };
                    }
                }
            }
        }
    }

    fn time_out(&self, attempts: u32, started: Instant, publisher: &Publisher) -> PollOutcome {
        let error = ConsoleError::new(ConsoleErrorKind::Timeout {
            attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        warn!(error = %error, "Giving up on job");
        let message = error.kind().to_string();
        if !publisher.fail(Some(message.clone()), message) {
            return PollOutcome::Superseded { attempts };
        }
        PollOutcome::TimedOut(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_unbounded() {
        let policy = PollPolicy::default();
        assert_eq!(*policy.interval(), Duration::from_millis(2000));
        assert_eq!(*policy.max_attempts(), None);
        assert_eq!(*policy.max_duration(), None);
    }

    #[test]
    fn builder_fills_defaults() {
        let policy = PollPolicy::builder()
            .max_duration(Some(Duration::from_secs(30)))
            .build()
            .unwrap();
        assert_eq!(*policy.interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(*policy.max_duration(), Some(Duration::from_secs(30)));
        assert_eq!(PollPolicy::every(Duration::from_millis(5)).max_attempts(), &None);
    }

    #[test]
    fn zero_interval_is_rejected_or_raised() {
        assert!(PollPolicy::builder().interval(Duration::ZERO).build().is_err());
        assert_eq!(*PollPolicy::every(Duration::ZERO).interval(), MIN_POLL_INTERVAL);
        assert_eq!(
            *PollPolicy::new(Duration::ZERO, Some(3), None).interval(),
            MIN_POLL_INTERVAL
        );
    }
}
