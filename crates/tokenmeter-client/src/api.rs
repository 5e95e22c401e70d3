//! HTTP client for the tokenmeter counting endpoint
//!
//! Sends typed text as JSON and file uploads as multipart form data,
//! mirroring the `POST /api` wire contract. The [`CountApi`] trait seam
//! lets the controller be tested without a network.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokenmeter_gateway::FileKind;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Normalized counting response as seen by the display layer
#[derive(Debug, Clone, Deserialize)]
pub struct CountSummary {
    /// Primary vendor token count; null when no count ran
    pub input_tokens: Option<u32>,
    /// Character count of the analyzed input
    #[serde(default)]
    pub chars: usize,
    /// Raw size of an uploaded file; 0 for typed-text requests
    #[serde(rename = "fileChars", default)]
    pub file_chars: usize,
    /// Model the count was performed against
    pub model: String,
    /// Best-effort GPT tokenizer estimate
    #[serde(rename = "gpt4oTokens")]
    pub gpt4o_tokens: Option<u32>,
    /// Best-effort gemini estimate
    #[serde(rename = "geminiTokens")]
    pub gemini_tokens: Option<u32>,
    /// Uploaded file name, when a file was counted
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
}

/// One file upload bound for the gateway
#[derive(Debug, Clone)]
pub struct FileSubmission {
    pub bytes: Bytes,
    pub file_name: String,
    pub media_type: Option<String>,
    pub declared_kind: FileKind,
    pub model: String,
}

/// Trait seam over the counting endpoint
#[async_trait]
pub trait CountApi: Send + Sync {
    /// Count typed text under the given model
    async fn count_text(&self, text: &str, model: &str) -> ClientResult<CountSummary>;

    /// Count an uploaded file
    async fn count_file(&self, submission: FileSubmission) -> ClientResult<CountSummary>;
}

/// Reqwest-backed client for a running gateway
pub struct HttpCountApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCountApi {
    /// Create a client against the given gateway base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn decode(response: reqwest::Response) -> ClientResult<CountSummary> {
        let status = response.status();
        if !status.is_success() {
            #[derive(Deserialize)]
            struct ErrorBody {
                error: String,
            }
            let message = response
                .json::<ErrorBody>()
                .await
                .map_or_else(|_| "request failed".to_string(), |body| body.error);
            return Err(ClientError::Gateway {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<CountSummary>().await?)
    }
}

#[async_trait]
impl CountApi for HttpCountApi {
    async fn count_text(&self, text: &str, model: &str) -> ClientResult<CountSummary> {
        debug!(chars = text.chars().count(), model, "Submitting text count");
        let response = self
            .client
            .post(format!("{}/api", self.base_url))
            .json(&json!({ "text": text, "model": model }))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn count_file(&self, submission: FileSubmission) -> ClientResult<CountSummary> {
        debug!(
            file = %submission.file_name,
            kind = %submission.declared_kind,
            size = submission.bytes.len(),
            "Submitting file count"
        );

        let mut part = reqwest::multipart::Part::bytes(submission.bytes.to_vec())
            .file_name(submission.file_name.clone());
        if let Some(media_type) = &submission.media_type {
            // An unparseable media type falls back to an untyped part
            part = match part.mime_str(media_type) {
                Ok(with_mime) => with_mime,
                Err(_) => reqwest::multipart::Part::bytes(submission.bytes.to_vec())
                    .file_name(submission.file_name.clone()),
            };
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", submission.model)
            .text("fileType", submission.declared_kind.to_string());

        let response = self
            .client
            .post(format!("{}/api", self.base_url))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn text_count_posts_json_and_decodes_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api"))
            .and(body_partial_json(serde_json::json!({
                "text": "Hello, world!",
                "model": "claude-3-5-sonnet-20241022"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "input_tokens": 10,
                "chars": 13,
                "fileChars": 0,
                "model": "claude-3-5-sonnet-20241022",
                "gpt4oTokens": 12,
                "geminiTokens": null
            })))
            .mount(&server)
            .await;

        let api = HttpCountApi::new(&server.uri());
        let summary = api
            .count_text("Hello, world!", "claude-3-5-sonnet-20241022")
            .await
            .expect("count should succeed");

        assert_eq!(summary.input_tokens, Some(10));
        assert_eq!(summary.chars, 13);
        assert_eq!(summary.gpt4o_tokens, Some(12));
        assert_eq!(summary.gemini_tokens, None);
    }

    #[tokio::test]
    async fn gateway_error_surfaces_generic_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "Failed to count tokens"
            })))
            .mount(&server)
            .await;

        let api = HttpCountApi::new(&server.uri());
        let err = api.count_text("hello", "claude-3-5-sonnet-20241022").await;

        match err {
            Err(ClientError::Gateway { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Failed to count tokens");
            }
            other => panic!("Expected gateway error, got {other:?}"),
        }
    }
}
