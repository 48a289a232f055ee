//! Error types for the Prodify generation console.
//!
//! Every error records the source location where it was created, so a failure
//! surfaced in the UI can be traced back to the exact call site.

mod config;
mod console;

pub use config::ConfigError;
pub use console::{ConsoleError, ConsoleErrorKind};

/// Crate-level error variants.
#[derive(Debug, derive_more::From, derive_more::Display)]
pub enum ProdifyErrorKind {
    /// Generation console error
    #[display("{_0}")]
    Console(ConsoleError),
    /// Configuration error
    #[display("{_0}")]
    Config(ConfigError),
    /// Terminal output error
    #[display("I/O error: {_0}")]
    Io(std::io::Error),
}

/// Prodify error with kind discrimination.
#[derive(Debug)]
pub struct ProdifyError(Box<ProdifyErrorKind>);

impl ProdifyError {
    /// Create a new error from a kind.
    pub fn new(kind: ProdifyErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ProdifyErrorKind {
        &self.0
    }
}

impl std::fmt::Display for ProdifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Prodify Error: {}", self.0)
    }
}

impl std::error::Error for ProdifyError {}

// Generic From implementation for any type that converts to ProdifyErrorKind
impl<T> From<T> for ProdifyError
where
    T: Into<ProdifyErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Prodify operations.
pub type ProdifyResult<T> = std::result::Result<T, ProdifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_error_converts_into_umbrella() {
        let err: ProdifyError = ConsoleError::new(ConsoleErrorKind::Stream("reset".into())).into();
        assert!(matches!(err.kind(), ProdifyErrorKind::Console(_)));
        assert!(err.to_string().contains("reset"));
    }

    #[test]
    fn config_error_converts_into_umbrella() {
        let err: ProdifyError = ConfigError::new("bad base_url").into();
        assert!(matches!(err.kind(), ProdifyErrorKind::Config(_)));
        assert!(err.to_string().starts_with("Prodify Error: Configuration Error"));
    }

    #[test]
    fn io_error_converts_into_umbrella() {
        let err: ProdifyError = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err.kind(), ProdifyErrorKind::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }
}
