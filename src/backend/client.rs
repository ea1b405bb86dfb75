//! HTTP client for the interview evaluation backend.
//!
//! A thin request/response wrapper around the three remote operations the
//! backend exposes: submit an answer recording for evaluation, fetch a
//! conversation, and send a message. Every call is a single attempt with no
//! retry, no backoff, and no idempotency key.

use crate::backend::error::BackendError;
use crate::backend::EvaluationSink;
use crate::config::BackendConfig;
use crate::recording::AudioArtifact;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON body returned by the evaluation endpoint.
#[derive(Debug, Deserialize)]
struct EvaluationResponse {
    /// Markdown-formatted feedback for the submitted answer
    result: String,
}

/// One message in a stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    pub body: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for the send-message passthrough.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub recipient: String,
    pub body: String,
}

/// Acknowledgement returned by the send-message endpoint.
#[derive(Debug, Deserialize)]
pub struct SendAck {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub id: Option<String>,
}

/// Client for the evaluation backend, bound to a configured base URL.
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    /// Builds a client from backend configuration.
    ///
    /// # Errors
    /// - If the underlying HTTP client cannot be constructed
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Submits a recorded answer for transcription and evaluation.
    ///
    /// The artifact is uploaded as a multipart file part named
    /// `recording.<ext>` alongside the question text.
    ///
    /// # Errors
    /// - `Network` when the backend is unreachable
    /// - `Server` on any error status
    /// - `InvalidResponse` when the body lacks the `result` field
    pub async fn submit_for_evaluation(
        &self,
        artifact: AudioArtifact,
        question: &str,
    ) -> Result<String, BackendError> {
        let url = self.endpoint("transcribe");
        let file_name = format!("recording.{}", artifact.encoding.extension());
        let mime = artifact.encoding.mime_type();

        tracing::debug!(
            "Submitting answer: url={}, file={}, {} bytes",
            url,
            file_name,
            artifact.bytes.len()
        );

        let file_part = reqwest::multipart::Part::bytes(artifact.bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| BackendError::InvalidResponse(format!("bad mime type: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("question", question.to_string());

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let response = check_status(response).await?;

        let evaluation: EvaluationResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            "Evaluation received: {} characters",
            evaluation.result.len()
        );
        Ok(evaluation.result)
    }

    /// Fetches the message list for a conversation. Simple pass-through.
    ///
    /// # Errors
    /// - `Network`, `Server`, or `InvalidResponse` as for evaluation
    pub async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, BackendError> {
        let url = self.endpoint(&format!(
            "messages/{}",
            urlencoding::encode(conversation_id)
        ));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    /// Sends a message payload. Simple pass-through.
    ///
    /// # Errors
    /// - `Network`, `Server`, or `InvalidResponse` as for evaluation
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<SendAck, BackendError> {
        let url = self.endpoint("send-message");

        let response = self
            .http
            .post(&url)
            .json(message)
            .send()
            .await
            .map_err(BackendError::from_transport)?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

/// Turns an error status into `BackendError::Server`, keeping the body for
/// the log.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::error!("Backend error response ({}): {}", status, body);
    Err(BackendError::Server {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl EvaluationSink for BackendClient {
    async fn submit(&self, artifact: AudioArtifact, question: &str) -> Result<String, BackendError> {
        self.submit_for_evaluation(artifact, question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn client(base_url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
        })
        .expect("client")
    }

    #[test]
    fn endpoint_joins_regardless_of_trailing_slash() {
        let with_slash = client("http://localhost:3000/api/");
        let without = client("http://localhost:3000/api");
        assert_eq!(
            with_slash.endpoint("transcribe"),
            "http://localhost:3000/api/transcribe"
        );
        assert_eq!(
            without.endpoint("/transcribe"),
            "http://localhost:3000/api/transcribe"
        );
    }

    #[test]
    fn evaluation_response_parses_result_field() {
        let body = r###"{"result": "## Feedback\n\n**Strong** answer."}"###;
        let parsed: EvaluationResponse = serde_json::from_str(body).expect("parse");
        assert!(parsed.result.starts_with("## Feedback"));
    }

    #[test]
    fn message_list_parses_with_missing_optional_fields() {
        let body = r#"[
            {"id": "m1", "sender": "coach", "body": "hello", "timestamp": "2026-01-01T00:00:00Z"},
            {"body": "just a body"}
        ]"#;
        let parsed: Vec<Message> = serde_json::from_str(body).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].body, "just a body");
        assert!(parsed[1].sender.is_none());
    }
}
