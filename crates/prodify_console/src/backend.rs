//! The seam between the console engine and the inference gateway.
//!
//! [`GenerationBackend`] is implemented by the HTTP client and by scripted
//! backends in tests; the engine only ever talks to the trait.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream, stream::BoxStream};
use prodify_core::{GenerationRequest, JobStatusResponse};
use prodify_error::ConsoleError;

/// Response body delivered as a stream of chunks with arbitrary boundaries.
pub type ByteStream = BoxStream<'static, Result<Bytes, ConsoleError>>;

/// Raw answer to a submission, before it is classified.
pub struct SubmissionResponse {
    content_type: Option<String>,
    body: ByteStream,
}

impl SubmissionResponse {
    /// Wraps a content type and a body stream.
    pub fn new(content_type: Option<String>, body: ByteStream) -> Self {
        Self { content_type, body }
    }

    /// A response whose body is already fully buffered.
    pub fn from_bytes(content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        Self::new(
            content_type.map(str::to_string),
            stream::once(async move { Ok(body) }).boxed(),
        )
    }

    /// A response whose body arrives as the given chunks, in order.
    pub fn from_chunks<I>(content_type: Option<&str>, chunks: I) -> Self
    where
        I: IntoIterator<Item = Result<Bytes, ConsoleError>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(
            content_type.map(str::to_string),
            stream::iter(chunks).boxed(),
        )
    }

    /// Declared content type, if the server sent one.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Consumes the response, yielding the body stream.
    pub fn into_body(self) -> ByteStream {
        self.body
    }
}

impl std::fmt::Debug for SubmissionResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionResponse")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Gateway operations the console engine depends on.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit a generation request and return the unclassified response.
    ///
    /// Resolves once response headers are available; the body is consumed
    /// lazily by the caller.
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmissionResponse, ConsoleError>;

    /// Fetch the current status of a job.
    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, ConsoleError>;

    /// List the model names the gateway can serve.
    async fn list_models(&self) -> Result<Vec<String>, ConsoleError>;
}
