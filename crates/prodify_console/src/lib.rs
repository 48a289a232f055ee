//! Response-consumption engine for the Prodify generation console.
//!
//! A submission is answered in one of three ways, and the engine picks exactly
//! one strategy for it:
//!
//! - an NDJSON body is decoded frame by frame ([`LineFrameDecoder`],
//!   [`extract_record`]) and accumulated into a growing text
//!   ([`StreamAccumulator`]);
//! - a synchronous body is reduced to display text once ([`extract_synchronous`]);
//! - a job identifier is followed by polling its status ([`JobPoller`]).
//!
//! [`route`] makes that choice. [`Console`] ties it together: it owns the
//! single [`OutputState`](prodify_core::OutputState) observers render, and
//! guarantees that a superseded or cancelled submission never writes to it
//! again.

mod accumulator;
mod backend;
mod client;
mod config;
mod console;
mod frame;
mod handle;
mod metrics;
mod poller;
mod publisher;
mod record;
mod router;

pub use accumulator::{StreamAccumulator, StreamOutcome};
pub use backend::{ByteStream, GenerationBackend, SubmissionResponse};
pub use client::{API_KEY_HEADER, ProdifyClient};
pub use config::{
    ConfigOverrides, ConsoleConfig, ConsoleConfigBuilder, DEFAULT_API_KEY, DEFAULT_BASE_URL,
    ENV_PREFIX,
};
pub use console::Console;
pub use frame::{LineFrameDecoder, frames};
pub use handle::GenerationHandle;
pub use metrics::ConsoleMetrics;
pub use poller::{
    DEFAULT_POLL_INTERVAL, JobPoller, MIN_POLL_INTERVAL, PollOutcome, PollPolicy, PollPolicyBuilder,
};
pub use publisher::{OutputChannel, Publisher};
pub use record::{IncrementalRecord, extract_record};
pub use router::{
    Route, RouteKind, classify_body, extract_synchronous, is_streaming_content_type, route,
};
