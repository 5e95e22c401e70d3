//! Secondary vendor estimator: local GPT tokenizer encoding
//!
//! Approximates GPT-family tokenization with tiktoken. Runs entirely
//! in-process, so unlike the hosted vendors it has no credential and no
//! network failure mode - only encoder selection can fail, at construction.

use crate::error::{VendorError, VendorResult};
use crate::traits::TokenEstimator;
use async_trait::async_trait;
use tiktoken_rs::{CoreBPE, cl100k_base, o200k_base};

const VENDOR_NAME: &str = "gpt";

/// Local token estimator using tiktoken encoders
pub struct TiktokenEstimator {
    model_name: String,
    encoder: CoreBPE,
}

impl TiktokenEstimator {
    /// Create an estimator with the appropriate encoder for a model name
    ///
    /// # Errors
    ///
    /// Returns `VendorError::Tokenizer` if the encoder fails to load.
    pub fn new(model_name: &str) -> VendorResult<Self> {
        let encoder = Self::encoder_for_model(model_name)?;
        Ok(Self {
            model_name: model_name.to_string(),
            encoder,
        })
    }

    /// Get the appropriate encoder for a model name
    fn encoder_for_model(model_name: &str) -> VendorResult<CoreBPE> {
        // GPT-4o and the o-series use o200k_base; earlier GPT-4/3.5 use cl100k_base
        let encoder = match model_name {
            name if name.starts_with("gpt-4o") || name.starts_with("o1") => o200k_base(),
            _ => cl100k_base(),
        };
        encoder.map_err(|e| VendorError::Tokenizer(e.to_string()))
    }

    /// Synchronous count of encoded tokens
    pub fn count(&self, text: &str) -> usize {
        self.encoder.encode_ordinary(text).len()
    }

    /// The model this estimator approximates
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl TokenEstimator for TiktokenEstimator {
    async fn estimate(&self, text: &str) -> VendorResult<u32> {
        Ok(u32::try_from(self.count(text)).unwrap_or(u32::MAX))
    }

    fn name(&self) -> &str {
        VENDOR_NAME
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;

    #[test]
    fn counts_simple_text() {
        let estimator = TiktokenEstimator::new("gpt-4o").expect("encoder should load");
        let count = estimator.count("Hello, world!");
        assert!(count > 0, "Should count tokens");
        assert!(count <= 5, "Simple text should be ~4 tokens");
    }

    #[test]
    fn empty_text_is_zero_tokens() {
        let estimator = TiktokenEstimator::new("gpt-4o").expect("encoder should load");
        assert_eq!(estimator.count(""), 0);
    }

    #[test]
    fn unknown_models_fall_back_to_cl100k() {
        let estimator = TiktokenEstimator::new("some-future-model").expect("encoder should load");
        assert!(estimator.count("hello") > 0);
    }

    #[tokio::test]
    async fn estimate_matches_sync_count() {
        let estimator = TiktokenEstimator::new("gpt-4o").expect("encoder should load");
        let sync = estimator.count("The quick brown fox");
        let estimated = estimator
            .estimate("The quick brown fox")
            .await
            .expect("local estimate cannot fail");
        assert_eq!(estimated as usize, sync);
    }

    #[test]
    fn handles_unicode() {
        let estimator = TiktokenEstimator::new("gpt-4o").expect("encoder should load");
        assert!(estimator.count("Hello 👋 World 🌍") > 0);
        assert!(estimator.count("你好世界") > 0);
    }
}
