//! Error taxonomy for the recording session boundary.

use thiserror::Error;

/// Errors surfaced by the recording controller.
///
/// All variants are non-fatal: the session stays usable and the user may retry
/// the action manually. No automatic retries anywhere.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Microphone acquisition failed: permission denied or no device present.
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    /// A new recording was requested while the previous answer is still
    /// being processed. Start requests are rejected, not queued.
    #[error("previous answer is still being processed, try again in a moment")]
    Busy,
}
