//! Deterministic vendor mocks for gateway and API tests

use crate::error::{VendorError, VendorResult};
use crate::traits::{ContentCounter, ImageMediaType, TokenEstimator};
use async_trait::async_trait;

/// Mock primary counter returning fixed counts (or a fixed failure)
pub struct MockContentCounter {
    text_tokens: VendorResult<u32>,
    image_tokens: VendorResult<u32>,
    pdf_tokens: VendorResult<u32>,
}

impl MockContentCounter {
    /// Mock that succeeds with the same count for every content kind
    pub const fn with_tokens(tokens: u32) -> Self {
        Self {
            text_tokens: Ok(tokens),
            image_tokens: Ok(tokens),
            pdf_tokens: Ok(tokens),
        }
    }

    /// Mock that fails every call with an upstream error
    pub fn failing() -> Self {
        let err = || VendorError::UpstreamStatus {
            vendor: "anthropic".to_string(),
            status: 500,
        };
        Self {
            text_tokens: Err(err()),
            image_tokens: Err(err()),
            pdf_tokens: Err(err()),
        }
    }
}

fn clone_result(result: &VendorResult<u32>) -> VendorResult<u32> {
    match result {
        Ok(n) => Ok(*n),
        Err(VendorError::UpstreamStatus { vendor, status }) => Err(VendorError::UpstreamStatus {
            vendor: vendor.clone(),
            status: *status,
        }),
        Err(e) => Err(VendorError::Tokenizer(e.to_string())),
    }
}

#[async_trait]
impl ContentCounter for MockContentCounter {
    async fn count_text(&self, _text: &str, _model: &str) -> VendorResult<u32> {
        clone_result(&self.text_tokens)
    }

    async fn count_image(
        &self,
        _data_base64: &str,
        _media_type: ImageMediaType,
        _model: &str,
    ) -> VendorResult<u32> {
        clone_result(&self.image_tokens)
    }

    async fn count_pdf(&self, _data_base64: &str, _model: &str) -> VendorResult<u32> {
        clone_result(&self.pdf_tokens)
    }
}

/// Mock estimator returning a fixed count or failing
pub struct MockEstimator {
    name: String,
    result: VendorResult<u32>,
}

impl MockEstimator {
    /// Mock that succeeds with a fixed count
    pub fn with_tokens(name: &str, tokens: u32) -> Self {
        Self {
            name: name.to_string(),
            result: Ok(tokens),
        }
    }

    /// Mock that fails every estimate
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            result: Err(VendorError::UpstreamStatus {
                vendor: name.to_string(),
                status: 503,
            }),
        }
    }
}

#[async_trait]
impl TokenEstimator for MockEstimator {
    async fn estimate(&self, _text: &str) -> VendorResult<u32> {
        clone_result(&self.result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
