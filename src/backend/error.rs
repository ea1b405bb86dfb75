//! Backend error taxonomy.

use thiserror::Error;

/// Failures from the evaluation backend.
///
/// Callers do not retry: every request is a single attempt whose failure is
/// logged and surfaced as a degraded UI state.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request could not reach the backend at all.
    #[error("could not reach the backend: {0}")]
    Network(String),

    /// The backend responded with an error status (>= 400).
    #[error("backend returned status {status}")]
    Server { status: u16, body: String },

    /// The backend responded 2xx but the body was not the expected JSON.
    #[error("malformed backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Maps a reqwest transport error into the taxonomy with a readable
    /// message.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let message = if err.is_connect() {
            "connection failed, is the backend running?".to_string()
        } else if err.is_timeout() {
            "request timed out, the backend is not responding".to_string()
        } else {
            err.to_string()
        };
        BackendError::Network(message)
    }
}
