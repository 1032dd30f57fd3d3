//! Error types for deadcode-core

use thiserror::Error;

/// Main error type for the deadcode-core library
///
/// The emitter hot path never surfaces these to the instrumented host; they
/// come from configuration loading, the collector and its storage.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed metric line received by the collector
    #[error("invalid metric {line:?}: {message}")]
    Parse { line: String, message: String },
}

impl Error {
    pub(crate) fn parse(line: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            line: line.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for deadcode-core
pub type Result<T> = std::result::Result<T, Error>;
