//! Error types for audiofeed
//!
//! This module provides the error handling used across the crate:
//! - Domain-specific error types (store, article extraction, external tools)
//! - A closed taxonomy ([`ErrorClass`]) that tells the dispatcher how a failure
//!   should be treated (rejected input, adapter failure or store failure)
//! - Machine-readable error codes for logs and events

use std::time::Duration;
use thiserror::Error;

/// Result type alias for audiofeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for audiofeed
///
/// Each variant includes enough context to be shown verbatim to the operator.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "feed.max_items")
        key: Option<String>,
    },

    /// Entry store operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Input that cannot start a pipeline (unrecognized link, bad command argument)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Request from a principal other than the configured one
    #[error("unauthorized principal {0}")]
    Unauthorized(i64),

    /// External tool execution failed (yt-dlp, vot-cli, edge-tts, ...)
    #[error("{tool} failed: {message}")]
    ExternalTool {
        /// Name of the tool that failed
        tool: &'static str,
        /// Failure details, including captured stderr when available
        message: String,
    },

    /// External invocation exceeded its wall-clock ceiling
    #[error("{tool} timed out after {after:?}")]
    Timeout {
        /// Name of the tool or service that timed out
        tool: &'static str,
        /// The ceiling that was exceeded
        after: Duration,
    },

    /// The downloader ran but produced no file
    #[error("no content: {0}")]
    Skip(String),

    /// Article extraction failed
    #[error("article extraction failed: {0}")]
    Article(#[from] ArticleError),

    /// Translation backend failed
    #[error("translation failed: {0}")]
    Translation(String),

    /// Speech synthesis failed
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// Message transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Pipeline was cancelled (shutdown in progress)
    #[error("cancelled: shutdown in progress")]
    Cancelled,

    /// Operation not supported (missing binary, no backend configured)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Entry store errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be converted back into an entry
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Article extraction errors
#[derive(Debug, Error)]
pub enum ArticleError {
    /// Page was fetched but yielded no readable text
    #[error("no text content found in article")]
    NoContent,

    /// Page could not be fetched
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed {
        /// The article URL
        url: String,
        /// Status code or transport error
        reason: String,
    },

    /// Response could not be parsed into an article
    #[error("failed to parse article: {0}")]
    ParseFailed(String),
}

/// Failure taxonomy used to decide how an error is surfaced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Unauthorized principal or malformed input; never starts a pipeline
    Rejected,
    /// External call failed; aborts the pipeline and is reported verbatim
    Adapter,
    /// Embedded store I/O failed; fatal to the operation
    Store,
    /// Aborted by shutdown
    Cancelled,
    /// Invalid configuration
    Config,
}

impl Error {
    /// Shorthand for an external tool failure
    pub fn tool(tool: &'static str, message: impl Into<String>) -> Self {
        Error::ExternalTool {
            tool,
            message: message.into(),
        }
    }

    /// Shorthand for a configuration error tied to a key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Classify this error into the failure taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidInput(_) | Error::Unauthorized(_) => ErrorClass::Rejected,
            Error::Database(_) | Error::Sqlx(_) => ErrorClass::Store,
            Error::Config { .. } => ErrorClass::Config,
            Error::Cancelled => ErrorClass::Cancelled,
            Error::Io(_)
            | Error::Network(_)
            | Error::Serialization(_)
            | Error::ExternalTool { .. }
            | Error::Timeout { .. }
            | Error::Skip(_)
            | Error::Article(_)
            | Error::Translation(_)
            | Error::Synthesis(_)
            | Error::Transport(_)
            | Error::NotSupported(_)
            | Error::Other(_) => ErrorClass::Adapter,
        }
    }

    /// Machine-readable error code for logs and events
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Unauthorized(_) => "unauthorized",
            Error::ExternalTool { .. } => "external_tool_error",
            Error::Timeout { .. } => "timeout",
            Error::Skip(_) => "no_content",
            Error::Article(e) => match e {
                ArticleError::NoContent => "article_no_content",
                ArticleError::FetchFailed { .. } => "article_fetch_failed",
                ArticleError::ParseFailed(_) => "article_parse_failed",
            },
            Error::Translation(_) => "translation_error",
            Error::Synthesis(_) => "synthesis_error",
            Error::Transport(_) => "transport_error",
            Error::Cancelled => "cancelled",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }
}

/// Wrap an I/O error with the path it concerned
pub(crate) fn io_at(path: &std::path::Path, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("{}: {}", path.display(), e),
    ))
}
