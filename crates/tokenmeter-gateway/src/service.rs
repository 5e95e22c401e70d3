//! The request-dispatch and normalization service
//!
//! [`TokenGateway`] owns the three vendor handles and implements the
//! dispatch policy: branch on payload kind, call the right vendor
//! capability in the right encoding, and merge the results into one
//! [`TokenCount`].

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokenmeter_common::CorrelationId;
use tokenmeter_config::GatewayConfig;
use tokenmeter_vendors::{ContentCounter, ImageMediaType, TokenEstimator};
use tracing::{info, instrument, warn};

use crate::error::GatewayResult;
use crate::types::{CountRequest, FileKind, TokenCount};

/// Trait seam for the counting service, enabling handler tests with mocks
#[async_trait]
pub trait CountingService: Send + Sync {
    /// Normalize one counting request into a uniform result
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::PrimaryCount` when the mandatory primary
    /// vendor call fails. Estimator failures never error - they yield
    /// null fields.
    async fn count(
        &self,
        request: CountRequest,
        correlation_id: &CorrelationId,
    ) -> GatewayResult<TokenCount>;
}

/// The normalization gateway
///
/// The secondary and tertiary estimators run concurrently and degrade
/// independently; the primary counter is mandatory in every branch.
pub struct TokenGateway {
    primary: Arc<dyn ContentCounter>,
    secondary: Arc<dyn TokenEstimator>,
    tertiary: Option<Arc<dyn TokenEstimator>>,
    default_model: String,
    config: GatewayConfig,
}

impl TokenGateway {
    /// Create a gateway over the given vendor handles
    ///
    /// `tertiary` is `None` when the tertiary vendor credential is absent;
    /// the field then stays null for every request.
    pub fn new(
        primary: Arc<dyn ContentCounter>,
        secondary: Arc<dyn TokenEstimator>,
        tertiary: Option<Arc<dyn TokenEstimator>>,
        default_model: String,
        config: GatewayConfig,
    ) -> Self {
        Self {
            primary,
            secondary,
            tertiary,
            default_model,
            config,
        }
    }

    /// Subtract the configured per-request overhead, floored at zero
    ///
    /// The primary vendor includes a fixed per-message scaffold in every
    /// count; this correction removes it for display. The constant is
    /// configuration because it is not a stable vendor fact.
    const fn corrected(&self, raw_tokens: u32) -> u32 {
        raw_tokens.saturating_sub(self.config.token_overhead)
    }

    /// Run both best-effort estimators concurrently
    ///
    /// Each estimator resolves to an independent optional field; one
    /// vendor's outage must not block the other's.
    async fn run_estimators(&self, text: &str) -> (Option<u32>, Option<u32>) {
        let secondary = async {
            match self.secondary.estimate(text).await {
                Ok(tokens) => Some(tokens),
                Err(e) => {
                    warn!(vendor = self.secondary.name(), error = %e, "Estimator degraded to null");
                    None
                }
            }
        };

        let tertiary = async {
            match self.tertiary.as_deref() {
                Some(estimator) => match estimator.estimate(text).await {
                    Ok(tokens) => Some(tokens),
                    Err(e) => {
                        warn!(vendor = estimator.name(), error = %e, "Estimator degraded to null");
                        None
                    }
                },
                None => None,
            }
        };

        tokio::join!(secondary, tertiary)
    }

    /// Text path: mandatory primary count plus concurrent estimates
    ///
    /// The response is assembled only after all attempted calls settle.
    async fn count_text(
        &self,
        text: &str,
        model: &str,
        file_name: Option<String>,
        file_bytes: usize,
    ) -> GatewayResult<TokenCount> {
        if text.trim().is_empty() {
            // No vendor call at all for empty input - a no-op success
            let mut empty = TokenCount::empty(model);
            empty.file_name = file_name;
            empty.file_bytes = file_bytes;
            return Ok(empty);
        }

        let (primary, (secondary, tertiary)) = tokio::join!(
            self.primary.count_text(text, model),
            self.run_estimators(text)
        );

        Ok(TokenCount {
            primary_tokens: Some(self.corrected(primary?)),
            secondary_tokens: secondary,
            tertiary_tokens: tertiary,
            char_count: text.chars().count(),
            file_bytes,
            model: model.to_string(),
            file_name,
        })
    }
}

#[async_trait]
impl CountingService for TokenGateway {
    #[instrument(skip(self, request), fields(correlation_id = %correlation_id))]
    async fn count(
        &self,
        request: CountRequest,
        correlation_id: &CorrelationId,
    ) -> GatewayResult<TokenCount> {
        let model = request
            .model()
            .unwrap_or(self.default_model.as_str())
            .to_string();

        match request {
            CountRequest::Text { text, .. } => {
                info!(
                    correlation_id = %correlation_id,
                    chars = text.chars().count(),
                    model = %model,
                    "Counting text payload"
                );
                self.count_text(&text, &model, None, 0).await
            }
            CountRequest::File {
                bytes,
                declared_kind,
                media_type,
                file_name,
                ..
            } => {
                info!(
                    correlation_id = %correlation_id,
                    kind = %declared_kind,
                    size = bytes.len(),
                    model = %model,
                    "Counting file payload"
                );
                match declared_kind {
                    FileKind::Pdf => {
                        let encoded = BASE64.encode(&bytes);
                        let raw = self.primary.count_pdf(&encoded, &model).await?;
                        Ok(TokenCount {
                            primary_tokens: Some(self.corrected(raw)),
                            secondary_tokens: None,
                            tertiary_tokens: None,
                            char_count: bytes.len(),
                            file_bytes: bytes.len(),
                            model,
                            file_name,
                        })
                    }
                    FileKind::Image => {
                        let encoded = BASE64.encode(&bytes);
                        let media = ImageMediaType::from_declared(media_type.as_deref().unwrap_or(""));
                        let raw = self.primary.count_image(&encoded, media, &model).await?;
                        Ok(TokenCount {
                            primary_tokens: Some(self.corrected(raw)),
                            secondary_tokens: None,
                            tertiary_tokens: None,
                            char_count: bytes.len(),
                            file_bytes: bytes.len(),
                            model,
                            file_name,
                        })
                    }
                    FileKind::Text | FileKind::Unknown => {
                        // Unknown files get the text treatment: decode and count.
                        // The raw byte length is kept separately; it differs
                        // from the decoded character count for multibyte text.
                        let file_bytes = bytes.len();
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        self.count_text(&text, &model, file_name, file_bytes).await
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]
    use super::*;
    use bytes::Bytes;
    use tokenmeter_vendors::test_mocks::{MockContentCounter, MockEstimator};

    fn gateway(
        primary: MockContentCounter,
        tertiary: Option<MockEstimator>,
    ) -> TokenGateway {
        TokenGateway::new(
            Arc::new(primary),
            Arc::new(MockEstimator::with_tokens("gpt", 12)),
            tertiary.map(|t| Arc::new(t) as Arc<dyn TokenEstimator>),
            "claude-3-5-sonnet-20241022".to_string(),
            GatewayConfig { token_overhead: 7 },
        )
    }

    fn text_request(text: &str) -> CountRequest {
        CountRequest::text(text, None)
    }

    fn file_request(bytes: &[u8], kind: FileKind) -> CountRequest {
        CountRequest::File {
            bytes: Bytes::copy_from_slice(bytes),
            declared_kind: kind,
            media_type: None,
            file_name: Some("upload.bin".to_string()),
            model: None,
        }
    }

    #[tokio::test]
    async fn text_count_is_deterministic_for_same_input() {
        let gw = gateway(
            MockContentCounter::with_tokens(57),
            Some(MockEstimator::with_tokens("gemini", 40)),
        );
        let id = CorrelationId::new();

        let first = gw.count(text_request("Hello, world!"), &id).await.unwrap();
        let second = gw.count(text_request("Hello, world!"), &id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.primary_tokens, Some(50)); // 57 raw minus 7 overhead
    }

    #[tokio::test]
    async fn empty_text_skips_all_vendors() {
        // A failing primary proves no vendor is called for empty input
        let gw = gateway(MockContentCounter::failing(), None);
        let result = gw
            .count(text_request("   \n\t"), &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(result.primary_tokens, None);
        assert_eq!(result.char_count, 0);
    }

    #[tokio::test]
    async fn overhead_subtraction_floors_at_zero() {
        let gw = gateway(MockContentCounter::with_tokens(3), None);
        let result = gw
            .count(text_request("hi"), &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(result.primary_tokens, Some(0));
    }

    #[tokio::test]
    async fn pdf_files_never_get_estimator_fields() {
        let gw = gateway(
            MockContentCounter::with_tokens(900),
            Some(MockEstimator::with_tokens("gemini", 999)),
        );
        let result = gw
            .count(file_request(b"%PDF-1.4", FileKind::Pdf), &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(result.secondary_tokens, None);
        assert_eq!(result.tertiary_tokens, None);
        assert_eq!(result.char_count, 8); // raw byte length
        assert_eq!(result.file_bytes, 8);
        assert_eq!(result.file_name.as_deref(), Some("upload.bin"));
    }

    #[tokio::test]
    async fn image_files_never_get_estimator_fields() {
        let gw = gateway(MockContentCounter::with_tokens(120), None);
        let result = gw
            .count(
                file_request(&[0xFF, 0xD8, 0xFF], FileKind::Image),
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.primary_tokens, Some(113));
        assert_eq!(result.secondary_tokens, None);
        assert_eq!(result.tertiary_tokens, None);
        assert_eq!(result.char_count, 3);
    }

    #[tokio::test]
    async fn text_file_counts_decoded_characters() {
        let gw = gateway(MockContentCounter::with_tokens(30), None);
        let payload = vec![b'a'; 100];
        let result = gw
            .count(file_request(&payload, FileKind::Text), &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(result.char_count, 100);
        assert_eq!(result.file_bytes, 100);
        assert_eq!(result.secondary_tokens, Some(12));
    }

    #[tokio::test]
    async fn multibyte_text_file_separates_bytes_from_characters() {
        let gw = gateway(MockContentCounter::with_tokens(30), None);
        // 5 characters, 6 bytes
        let result = gw
            .count(
                file_request("héllo".as_bytes(), FileKind::Text),
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.char_count, 5);
        assert_eq!(result.file_bytes, 6);
    }

    #[tokio::test]
    async fn unknown_files_are_treated_as_text() {
        let gw = gateway(MockContentCounter::with_tokens(30), None);
        let result = gw
            .count(file_request(b"plain words", FileKind::Unknown), &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(result.primary_tokens, Some(23));
        assert_eq!(result.char_count, 11);
    }

    #[tokio::test]
    async fn missing_tertiary_credential_degrades_to_null() {
        let gw = gateway(MockContentCounter::with_tokens(57), None);
        let result = gw
            .count(text_request("Hello, world!"), &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(result.tertiary_tokens, None);
        assert_eq!(result.primary_tokens, Some(50));
        assert_eq!(result.secondary_tokens, Some(12));
    }

    #[tokio::test]
    async fn failing_estimator_does_not_fail_the_request() {
        let gw = gateway(
            MockContentCounter::with_tokens(57),
            Some(MockEstimator::failing("gemini")),
        );
        let result = gw
            .count(text_request("Hello, world!"), &CorrelationId::new())
            .await
            .unwrap();

        assert_eq!(result.primary_tokens, Some(50));
        assert_eq!(result.tertiary_tokens, None);
    }

    #[tokio::test]
    async fn failing_primary_fails_the_whole_request() {
        let gw = gateway(
            MockContentCounter::failing(),
            Some(MockEstimator::with_tokens("gemini", 40)),
        );
        let result = gw
            .count(text_request("Hello, world!"), &CorrelationId::new())
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn caller_model_overrides_default() {
        let gw = gateway(MockContentCounter::with_tokens(20), None);
        let result = gw
            .count(
                CountRequest::text("hello", Some("claude-3-opus-20240229".to_string())),
                &CorrelationId::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.model, "claude-3-opus-20240229");
    }
}
