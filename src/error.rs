//! Error types for video job orchestration.

use std::time::Duration;

/// Errors that can occur while submitting or polling a generation job.
#[derive(Debug, thiserror::Error)]
pub enum VivifyError {
    /// Bad or missing input. Never retried.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Missing credentials or model configuration. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend has no record of the job id.
    #[error("job not found: {0}")]
    NotFound(String),

    /// The backend rejected the request or faulted; carries its message verbatim.
    #[error("upstream error: {status} - {message}")]
    Upstream {
        /// HTTP status code the backend answered with.
        status: u16,
        /// Backend error text, verbatim where available.
        message: String,
    },

    /// Wall-clock ceiling exceeded while polling.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The flow was canceled by the caller before reaching a terminal state.
    #[error("canceled")]
    Canceled,

    /// Network or HTTP transport error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (e.g. reading the input image).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VivifyError {
    /// Returns true if a later poll tick could plausibly succeed.
    ///
    /// There is no internal retry mechanism; the polling cadence itself is
    /// the retry cadence.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Trims and bounds a backend error body for display and logging.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    const MAX_LEN: usize = 500;

    let trimmed = text.trim();
    if trimmed.len() <= MAX_LEN {
        return trimmed.to_string();
    }
    let mut end = MAX_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

/// Result type alias for job orchestration operations.
pub type Result<T> = std::result::Result<T, VivifyError>;
