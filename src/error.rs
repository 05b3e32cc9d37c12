//! Error types for tsk
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad query, unknown task, illegal transition)
//! - 4: Operation failed (store/git/serialization error)
//!
//! The core never retries and never swallows an error; every failure
//! propagates to the invoking command, which terminates the process with a
//! non-zero status and a message.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tsk CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tsk operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Context conflicts with query on {field}: context has {context}, query has {query}")]
    ConflictingContext {
        field: &'static str,
        context: String,
        query: String,
    },

    #[error("Duplicate due filter: {0}")]
    DuplicateDueFilter(String),

    #[error("Ambiguous identity prefix: {0}")]
    AmbiguousIdentity(String),

    #[error("No task found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Operation failures (exit code 4)
    #[error("Task store unavailable: {0}")]
    StoreUnavailable(PathBuf),

    #[error("Corrupt task record {path}: {reason}")]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("Handle space exhausted (more than {0} open tasks)")]
    HandleSpaceExhausted(u32),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidTask(_)
            | Error::InvalidTransition { .. }
            | Error::ConflictingContext { .. }
            | Error::DuplicateDueFilter(_)
            | Error::AmbiguousIdentity(_)
            | Error::NotFound(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            // Operation failures
            Error::StoreUnavailable(_)
            | Error::CorruptRecord { .. }
            | Error::HandleSpaceExhausted(_)
            | Error::Git(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for tsk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
        }
    }
}
