//! OpenTelemetry instruments for the console engine.
//!
//! Instruments record into the global meter; until a provider is installed
//! (see `prodify_core::init_observability`) they are no-ops.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use prodify_core::GenerationStatus;

/// Counters and histograms for submissions, frames and polls.
#[derive(Clone)]
pub struct ConsoleMetrics {
    /// Submissions by route taken
    submissions: Counter<u64>,
    /// Stream frames consumed, labelled delta or raw
    frames: Counter<u64>,
    /// Status requests issued
    polls: Counter<u64>,
    /// Terminal outcomes by status
    outcomes: Counter<u64>,
    /// Publishes dropped because the submission was superseded or cancelled
    stale_updates: Counter<u64>,
    /// Wall time from submit to terminal state
    duration: Histogram<f64>,
}

impl ConsoleMetrics {
    /// Create instruments on the `prodify_console` meter.
    pub fn new() -> Self {
        let meter = global::meter("prodify_console");

        Self {
            submissions: meter
                .u64_counter("console.submissions")
                .with_description("Generation submissions by response route")
                .build(),
            frames: meter
                .u64_counter("console.stream.frames")
                .with_description("Stream frames consumed")
                .build(),
            polls: meter
                .u64_counter("console.job.polls")
                .with_description("Job status requests issued")
                .build(),
            outcomes: meter
                .u64_counter("console.outcomes")
                .with_description("Terminal submission outcomes")
                .build(),
            stale_updates: meter
                .u64_counter("console.stale_updates")
                .with_description("Updates discarded after supersession or cancellation")
                .build(),
            duration: meter
                .f64_histogram("console.duration")
                .with_unit("seconds")
                .with_description("Time from submission to terminal state")
                .build(),
        }
    }

    /// Record which route a submission took.
    pub fn record_submission(&self, route: &'static str) {
        self.submissions.add(1, &[KeyValue::new("route", route)]);
    }

    /// Record one consumed frame.
    pub fn record_frame(&self, delta: bool) {
        let kind = if delta { "delta" } else { "raw" };
        self.frames.add(1, &[KeyValue::new("kind", kind)]);
    }

    /// Record one status request.
    pub fn record_poll(&self) {
        self.polls.add(1, &[]);
    }

    /// Record a terminal outcome.
    pub fn record_outcome(&self, status: &GenerationStatus, duration_secs: f64) {
        let labels = &[KeyValue::new("status", status.to_string())];
        self.outcomes.add(1, labels);
        self.duration.record(duration_secs, labels);
    }

    /// Record a discarded update.
    pub fn record_stale(&self) {
        self.stale_updates.add(1, &[]);
    }
}

impl Default for ConsoleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConsoleMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleMetrics").finish_non_exhaustive()
    }
}
