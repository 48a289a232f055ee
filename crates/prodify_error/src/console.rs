//! Errors raised while submitting a generation and consuming its response.

/// Specific error conditions for the generation console.
///
/// Frame parse failures never show up here: a frame that is not structured
/// data degrades to raw text inside the record extractor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConsoleErrorKind {
    /// Transport failure before a response arrived
    #[display("HTTP error: {_0}")]
    Http(String),
    /// Server answered with a non-success status
    #[display("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },
    /// I/O failure while reading a streaming body
    #[display("Stream interrupted: {_0}")]
    Stream(String),
    /// Job-oriented response without a usable job identifier
    #[display("Unexpected submission response: {_0}")]
    Submission(String),
    /// Server reported the job as failed
    #[display("Job failed: {_0}")]
    JobFailed(String),
    /// Polling bound exceeded before a terminal state
    #[display("Job did not finish after {attempts} polls ({elapsed_ms} ms)")]
    Timeout {
        /// Status requests issued
        attempts: u32,
        /// Time spent polling in milliseconds
        elapsed_ms: u64,
    },
    /// Request rejected before it was sent
    #[display("Invalid request: {_0}")]
    InvalidRequest(String),
    /// Response body could not be decoded
    #[display("Response parsing failed: {_0}")]
    ResponseParsing(String),
    /// Builder error
    #[display("Builder error: {_0}")]
    Builder(String),
}

impl ConsoleErrorKind {
    /// Whether a status poll that failed this way may simply be retried on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            ConsoleErrorKind::Http(_) => true,
            ConsoleErrorKind::Api { status, .. } => {
                matches!(*status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

/// Generation console error with location tracking.
///
/// # Examples
///
/// ```
/// use prodify_error::{ConsoleError, ConsoleErrorKind};
///
/// let err = ConsoleError::new(ConsoleErrorKind::JobFailed("OOM".to_string()));
/// assert!(format!("{}", err).contains("OOM"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Console Error: {} at line {} in {}", kind, line, file)]
pub struct ConsoleError {
    kind: ConsoleErrorKind,
    line: u32,
    file: &'static str,
}

impl ConsoleError {
    /// Create a new console error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ConsoleErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConsoleErrorKind {
        &self.kind
    }

    /// Line where the error was created.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// File where the error was created.
    pub fn file(&self) -> &'static str {
        self.file
    }
}

impl<T> From<T> for ConsoleError
where
    T: Into<ConsoleErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_creation_site() {
        let err = ConsoleError::new(ConsoleErrorKind::Http("refused".into()));
        assert!(err.file().ends_with("console.rs"));
        assert!(err.line() > 0);
        assert!(err.to_string().contains("HTTP error: refused"));
    }

    #[test]
    fn transient_kinds() {
        assert!(ConsoleErrorKind::Http("reset".into()).is_transient());
        assert!(
            ConsoleErrorKind::Api {
                status: 503,
                message: "busy".into()
            }
            .is_transient()
        );
        assert!(
            !ConsoleErrorKind::Api {
                status: 404,
                message: "no such job".into()
            }
            .is_transient()
        );
        assert!(!ConsoleErrorKind::JobFailed("OOM".into()).is_transient());
    }

    #[test]
    fn timeout_message_names_bounds() {
        let kind = ConsoleErrorKind::Timeout {
            attempts: 3,
            elapsed_ms: 6000,
        };
        assert_eq!(kind.to_string(), "Job did not finish after 3 polls (6000 ms)");
    }
}
