//! Backend boundary: the external collaborator reached over HTTP.

pub mod client;
pub mod error;

pub use client::{BackendClient, Message, OutgoingMessage, SendAck};
pub use error::BackendError;

use crate::recording::AudioArtifact;
use async_trait::async_trait;

/// Upload seam between the recording controller and the backend.
///
/// The controller only needs "submit this artifact for this question"; hiding
/// the client behind this trait lets tests drive whole sessions without a
/// network.
#[async_trait]
pub trait EvaluationSink: Send + Sync {
    /// Submits one recorded answer and resolves to its Markdown evaluation.
    ///
    /// # Errors
    /// - Any [`BackendError`]; callers never retry
    async fn submit(&self, artifact: AudioArtifact, question: &str) -> Result<String, BackendError>;
}
