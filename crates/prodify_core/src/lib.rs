//! Core data types for the Prodify generation console.
//!
//! This crate provides the values exchanged between the console engine, the
//! inference gateway and whatever UI renders the output.

mod dto;
mod job;
mod observability;
mod output;
mod request;

pub use dto::{Health, ModelsResponse, Readiness};
pub use job::{Job, JobState, JobStatusResponse, NO_TEXT_PLACEHOLDER};
pub use observability::{init_observability, init_tracing, shutdown_observability};
pub use output::{GenerationStatus, OutputState};
pub use request::{
    DEFAULT_MAX_TOKENS, GenerationRequest, GenerationRequestBuilder, MAX_TOKENS_MAX,
    MAX_TOKENS_MIN, MAX_TOKENS_STEP, quantize_max_tokens,
};
