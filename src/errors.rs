/*!
 * Error types for the storydoc application.
 *
 * Each stage of the pipeline has its own error enum, defined with thiserror:
 * retrieval, parsing, the fetch cache, output writing and configuration.
 * `AppError` wraps them all for the batch loop.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Hint shown when an output file cannot be written because of permissions
pub const LOCKED_FILE_HINT: &str =
    "The file may be open in another program such as Word. Close it and retry, or choose another output path.";

/// Hint shown when the target directory itself is not writable
pub const READ_ONLY_DIR_HINT: &str =
    "Check that the output directory exists and is writable.";

/// Errors that can occur when retrieving raw script text or listings
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The request could not be sent or the connection failed
    #[error("Request failed for '{name}': {message}")]
    RequestFailed {
        /// Name or target that was requested
        name: String,
        /// Underlying error message
        message: String,
    },

    /// The remote side responded with a non-success status
    #[error("Server responded with {status_code} for '{name}'")]
    Status {
        /// Name or target that was requested
        name: String,
        /// HTTP status code
        status_code: u16,
    },

    /// Nothing exists under the requested name
    #[error("'{0}' was not found")]
    NotFound(String),

    /// A response arrived but its content could not be understood
    #[error("Unexpected response for '{name}': {message}")]
    InvalidResponse {
        /// Name or target that was requested
        name: String,
        /// What was wrong with the response
        message: String,
    },
}

impl RetrievalError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed { .. } => true,
            Self::Status { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::NotFound(_) | Self::InvalidResponse { .. } => false,
        }
    }
}

/// Errors that can occur while parsing script text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A line could not be classified with confidence (malformed bracket nesting)
    #[error("Ambiguous line {index}: {line}")]
    Ambiguous {
        /// Position of the line in its unit
        index: usize,
        /// The offending line
        line: String,
    },

    /// The whole text is not usable script content
    #[error("Malformed script content: {0}")]
    MalformedContent(String),
}

/// Errors raised by the fetch cache store
#[derive(Error, Debug)]
pub enum CacheError {
    /// A stored record could not be decoded
    #[error("Cached record '{key}' is corrupted: {reason}")]
    Corrupted {
        /// Display form of the cache key
        key: String,
        /// Why the record was rejected
        reason: String,
    },

    /// The backing store failed
    #[error("Cache store error: {0}")]
    Store(String),
}

impl From<anyhow::Error> for CacheError {
    fn from(error: anyhow::Error) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Store(error.to_string())
    }
}

/// Errors that can occur while persisting a document
#[derive(Error, Debug)]
pub enum OutputWriteError {
    /// The target exists but cannot be replaced
    #[error("Cannot write '{}': permission denied. {hint}", path.display())]
    PermissionDenied {
        /// Target path
        path: PathBuf,
        /// Remediation hint for the user
        hint: &'static str,
    },

    /// Any other I/O failure
    #[error("Failed to write '{}': {message}", path.display())]
    Io {
        /// Target path
        path: PathBuf,
        /// Underlying error message
        message: String,
    },

    /// The document could not be encoded into the output format
    #[error("Failed to encode '{}': {message}", path.display())]
    Encode {
        /// Target path
        path: PathBuf,
        /// Underlying error message
        message: String,
    },
}

impl OutputWriteError {
    /// Classify an I/O error raised while writing `path`
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::PermissionDenied {
            let hint = if path.is_file() { LOCKED_FILE_HINT } else { READ_ONLY_DIR_HINT };
            Self::PermissionDenied { path: path.to_path_buf(), hint }
        } else {
            Self::Io { path: path.to_path_buf(), message: error.to_string() }
        }
    }
}

/// Errors in configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A field holds a value outside its accepted range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Dotted field path, e.g. `document.spacer_lines`
        field: String,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue { field: field.into(), message: message.into() }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a retriever
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Error from the script parser
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error from the fetch cache
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error from the document writer
    #[error("Output error: {0}")]
    Output(#[from] OutputWriteError),

    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
