//! Classification of a submission response into a consumption strategy.

use crate::{ByteStream, SubmissionResponse};
use futures_util::TryStreamExt;
use prodify_core::NO_TEXT_PLACEHOLDER;
use prodify_error::ConsoleError;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// How a submission response must be consumed.
pub enum Route {
    /// Incremental body; frames are decoded and accumulated as they arrive
    Stream(ByteStream),
    /// Complete result already extracted from the body
    Synchronous(String),
    /// Server accepted the request as a job; carries the job identifier
    Job(String),
    /// Job-oriented response that cannot be followed; carries a description
    Malformed(String),
}

/// Discriminant of a [`Route`], used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RouteKind {
    /// See [`Route::Stream`]
    Stream,
    /// See [`Route::Synchronous`]
    Synchronous,
    /// See [`Route::Job`]
    Job,
    /// See [`Route::Malformed`]
    Malformed,
}

impl Route {
    /// Which strategy this route selects.
    pub fn kind(&self) -> RouteKind {
        match self {
            Route::Stream(_) => RouteKind::Stream,
            Route::Synchronous(_) => RouteKind::Synchronous,
            Route::Job(_) => RouteKind::Job,
            Route::Malformed(_) => RouteKind::Malformed,
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Stream(_) => f.write_str("Stream(..)"),
            Route::Synchronous(text) => f.debug_tuple("Synchronous").field(text).finish(),
            Route::Job(id) => f.debug_tuple("Job").field(id).finish(),
            Route::Malformed(reason) => f.debug_tuple("Malformed").field(reason).finish(),
        }
    }
}

/// Selects exactly one strategy for a submission response.
///
/// A streaming content type is routed without touching the body. Any other
/// body is read to the end and classified with [`classify_body`]; bounding
/// that read is up to the backend ([`ProdifyClient`](crate::ProdifyClient)
/// buffers such bodies under its request timeout).
///
/// # Errors
///
/// Returns the body's error if reading a non-streaming body fails.
#[instrument(skip(response), fields(content_type = response.content_type()))]
pub async fn route(response: SubmissionResponse) -> Result<Route, ConsoleError> {
    if response
        .content_type()
        .is_some_and(is_streaming_content_type)
    {
        debug!("Routing to stream accumulator");
        return Ok(Route::Stream(response.into_body()));
    }

    let body: Vec<u8> = response
        .into_body()
        .try_fold(Vec::new(), |mut body, chunk| async move {
            body.extend_from_slice(&chunk);
            Ok::<_, ConsoleError>(body)
        })
        .await?;

    let route = classify_body(&body);
    debug!(route = %route.kind(), body_len = body.len(), "Classified response body");
    Ok(route)
}

/// Whether a content type announces newline-delimited JSON.
///
/// # Examples
///
/// ```
/// use prodify_console::is_streaming_content_type;
///
/// assert!(is_streaming_content_type("application/x-ndjson; charset=utf-8"));
/// assert!(!is_streaming_content_type("application/json"));
/// ```
pub fn is_streaming_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("ndjson") || lowered.contains("jsonl")
}

/// Classifies a fully buffered, non-streaming body.
pub fn classify_body(body: &[u8]) -> Route {
    let value = match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(e) => {
            let text = String::from_utf8_lossy(body).into_owned();
            if text.trim().is_empty() {
                return Route::Synchronous(NO_TEXT_PLACEHOLDER.to_string());
            }
            debug!(error = %e, "Body is not JSON, showing it as text");
            return Route::Synchronous(text);
        }
    };

    if let Some(object) = value.as_object() {
        if let Some(job_id) = object.get("job_id") {
            return match job_id {
                Value::String(id) if !id.trim().is_empty() => Route::Job(id.clone()),
                Value::Number(id) => Route::Job(id.to_string()),
                other => {
                    warn!(job_id = %other, "Job response without a usable job id");
                    Route::Malformed(format!("job response carried job_id {}", other))
                }
            };
        }

        let pending = object
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|s| matches!(s, "queued" | "processing" | "pending"));
        let has_text = ["response", "generated_text", "choices", "text"]
            .iter()
            .any(|field| object.contains_key(*field));
        if pending && !has_text {
            warn!("Job-style status without a job id");
            return Route::Malformed("job status received without a job_id".to_string());
        }
    }

    Route::Synchronous(extract_synchronous(&value))
}

/// Extracts display text from a synchronous result body.
///
/// Recognized shapes, first non-empty match wins:
/// 1. a bare JSON string
/// 2. `{"response": "<text>"}`
/// 3. `{"generated_text": "<text>"}` or `[{"generated_text": "<text>"}]`
/// 4. `{"choices": [{"message": {"content": "<text>"}}]}`
///
/// Anything else is shown as pretty-printed JSON.
///
/// # Examples
///
/// ```
/// use prodify_console::extract_synchronous;
/// use serde_json::json;
///
/// assert_eq!(extract_synchronous(&json!({"generated_text": "Hi"})), "Hi");
/// assert_eq!(
///     extract_synchronous(&json!({"choices": [{"message": {"content": "Yo"}}]})),
///     "Yo"
/// );
/// ```
pub fn extract_synchronous(value: &Value) -> String {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    non_empty(Some(value))
        .or_else(|| non_empty(value.get("response")))
        .or_else(|| non_empty(value.get("generated_text")))
        .or_else(|| non_empty(value.pointer("/0/generated_text")))
        .or_else(|| non_empty(value.pointer("/choices/0/message/content")))
        .unwrap_or_else(|| {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        })
}
