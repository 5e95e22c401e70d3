//! Primary vendor client: Anthropic-style hosted token counting
//!
//! Wraps `POST /v1/messages/count_tokens`, which accepts the same content
//! blocks as the messages API (text, image, PDF document) and returns the
//! input token count without generating anything.

use crate::error::{VendorError, VendorResult};
use crate::traits::{ContentCounter, ImageMediaType};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

const VENDOR_NAME: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

// PDF document blocks require the capability flag to be set on the request
const PDF_BETA_FLAG: &str = "pdfs-2024-09-25";

/// Hosted token counter for the primary vendor
pub struct AnthropicCounter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Response shape of the count_tokens endpoint
#[derive(Debug, Deserialize)]
struct CountTokensResponse {
    input_tokens: u32,
}

impl AnthropicCounter {
    /// Create a counter against the given base URL and credential
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// POST a count_tokens request with the given content blocks
    async fn count_blocks(
        &self,
        blocks: Value,
        model: &str,
        beta_flag: Option<&str>,
    ) -> VendorResult<u32> {
        let url = format!("{}/v1/messages/count_tokens", self.base_url);

        let mut request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": model,
                "messages": [{"role": "user", "content": blocks}]
            }));

        if let Some(flag) = beta_flag {
            request = request.header("anthropic-beta", flag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VendorError::network(VENDOR_NAME, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VendorError::UpstreamStatus {
                vendor: VENDOR_NAME.to_string(),
                status: status.as_u16(),
            });
        }

        let body: CountTokensResponse = response
            .json()
            .await
            .map_err(|e| VendorError::unexpected(VENDOR_NAME, e.to_string()))?;

        debug!(model, input_tokens = body.input_tokens, "Primary count completed");
        Ok(body.input_tokens)
    }
}

#[async_trait]
impl ContentCounter for AnthropicCounter {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn count_text(&self, text: &str, model: &str) -> VendorResult<u32> {
        let blocks = json!([{"type": "text", "text": text}]);
        self.count_blocks(blocks, model, None).await
    }

    #[instrument(skip(self, data_base64))]
    async fn count_image(
        &self,
        data_base64: &str,
        media_type: ImageMediaType,
        model: &str,
    ) -> VendorResult<u32> {
        let blocks = json!([{
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": media_type.as_str(),
                "data": data_base64
            }
        }]);
        self.count_blocks(blocks, model, None).await
    }

    #[instrument(skip(self, data_base64))]
    async fn count_pdf(&self, data_base64: &str, model: &str) -> VendorResult<u32> {
        let blocks = json!([{
            "type": "document",
            "source": {
                "type": "base64",
                "media_type": "application/pdf",
                "data": data_base64
            }
        }]);
        self.count_blocks(blocks, model, Some(PDF_BETA_FLAG)).await
    }
}
