//! Tertiary vendor client: Gemini-style hosted token counting
//!
//! Wraps `POST /v1beta/models/{model}:countTokens`. This vendor is
//! best-effort: the gateway only constructs a client when a credential is
//! configured, and any runtime failure degrades the field to null.

use crate::error::{VendorError, VendorResult};
use crate::traits::TokenEstimator;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

const VENDOR_NAME: &str = "gemini";

/// Hosted token estimator for the tertiary vendor
pub struct GeminiCounter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// Response shape of the countTokens endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: u32,
}

impl GeminiCounter {
    /// Create an estimator against the given base URL, credential, and model
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TokenEstimator for GeminiCounter {
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn estimate(&self, text: &str) -> VendorResult<u32> {
        let url = format!(
            "{}/v1beta/models/{}:countTokens",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{"parts": [{"text": text}]}]
            }))
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

        debug!(model = %self.model, total_tokens = body.total_tokens, "Gemini count completed");
        Ok(body.total_tokens)
    }

    fn name(&self) -> &str {
        VENDOR_NAME
    }
}
