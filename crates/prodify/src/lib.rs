//! Client and console for the Prodify inference gateway.
//!
//! Re-exports the workspace crates under one name:
//!
//! - [`prodify_error`]: location-tracking error types
//! - [`prodify_core`]: requests, job states and the observable output state
//! - [`prodify_console`]: the response-consumption engine and HTTP client

pub use prodify_console::*;
pub use prodify_core::*;
pub use prodify_error::*;
