//! Reelsmith Error Definitions
//!
//! Defines error types used throughout the pipeline.

use thiserror::Error;

/// Core pipeline error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or out-of-range parameters, detected before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing asset, or an asset whose stage precedes the required
    /// predecessor stage for the requested operation.
    #[error("Not found: {0}")]
    NotFound(String),

    /// External engine failure: nonzero process exit or non-2xx response.
    /// `status` carries the exit code / HTTP status when known.
    #[error("Upstream error{}: {detail}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Upstream { status: Option<i32>, detail: String },

    /// An external invocation exceeded its deadline and was terminated.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Ledger write contention or duplicate id; retryable by the caller.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core pipeline result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Upstream failure from a process exit.
    pub fn upstream_exit(exit_code: Option<i32>, stderr: &str) -> Self {
        Self::Upstream {
            status: exit_code,
            detail: stderr.trim_end().to_string(),
        }
    }

    /// Upstream failure from an HTTP response.
    pub fn upstream_http(status: u16, body: &str) -> Self {
        Self::Upstream {
            status: Some(status as i32),
            detail: body.trim_end().to_string(),
        }
    }
}
