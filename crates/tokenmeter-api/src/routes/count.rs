//! The counting endpoint: `POST /api`
//!
//! Accepts either an `application/json` body `{text, model?}` or a
//! `multipart/form-data` body with `file`, `model`, and `fileType`
//! fields, and returns the gateway's normalized counts in the flat wire
//! shape the display layer consumes.
//!
//! Malformed or empty input never errors: it short-circuits to an
//! empty/zero result without any vendor call. Only a primary-vendor
//! failure produces an error response, and that response is a single
//! generic `{"error": "Failed to count tokens"}` with status 500.

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Extension, Json, Router, routing::post};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokenmeter_common::CorrelationId;
use tokenmeter_gateway::{CountRequest, FileKind, TokenCount};
use tracing::{info, instrument, warn};

use crate::middleware::RequestContext;
use crate::state::AppState;
use crate::{ApiError, ApiResult};

/// Upload size cap: primary vendor rejects anything bigger anyway
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// JSON request payload for typed-text counting
#[derive(Debug, Default, Deserialize)]
pub struct TextPayload {
    /// The text to count tokens for
    #[serde(default)]
    pub text: String,
    /// Optional model override
    #[serde(default)]
    pub model: Option<String>,
}

/// Flat wire shape of a counting response
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    /// Overhead-corrected primary vendor count; null when no count ran
    pub input_tokens: Option<u32>,
    /// Character count of the analyzed input
    pub chars: usize,
    /// Raw byte length of an uploaded file; 0 for typed-text requests
    #[serde(rename = "fileChars")]
    pub file_chars: usize,
    /// The model the primary count was performed against
    pub model: String,
    /// Best-effort local GPT tokenizer estimate
    #[serde(rename = "gpt4oTokens")]
    pub gpt4o_tokens: Option<u32>,
    /// Best-effort hosted gemini estimate
    #[serde(rename = "geminiTokens")]
    pub gemini_tokens: Option<u32>,
    /// Original file name of an uploaded file
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl CountResponse {
    fn from_count(count: TokenCount) -> Self {
        Self {
            input_tokens: count.primary_tokens,
            chars: count.char_count,
            file_chars: count.file_bytes,
            model: count.model,
            gpt4o_tokens: count.secondary_tokens,
            gemini_tokens: count.tertiary_tokens,
            file_name: count.file_name,
        }
    }
}

/// Create the counting routes with injected state
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api", post(count_handler))
        .with_state(state)
}

/// One multipart upload, decoded field by field
#[derive(Debug, Default)]
struct FileUpload {
    bytes: Option<Bytes>,
    file_name: Option<String>,
    media_type: Option<String>,
    declared_kind: Option<FileKind>,
    model: Option<String>,
}

/// Read the multipart fields the contract defines: file, model, fileType
///
/// Unreadable fields are skipped rather than failing the request -
/// malformed input is the caller's no-op, not an error.
async fn read_multipart(mut multipart: Multipart) -> FileUpload {
    let mut upload = FileUpload::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("file") => {
                upload.file_name = field.file_name().map(ToString::to_string);
                upload.media_type = field.content_type().map(ToString::to_string);
                match field.bytes().await {
                    Ok(bytes) => upload.bytes = Some(bytes),
                    Err(e) => warn!(error = %e, "Failed to read multipart file field"),
                }
            }
            Some("model") => {
                upload.model = field.text().await.ok().filter(|m| !m.is_empty());
            }
            Some("fileType") => {
                upload.declared_kind = field.text().await.ok().map(|t| FileKind::from_wire(&t));
            }
            _ => {}
        }
    }

    upload
}

/// Handler for token counting requests
///
/// Branches on the request content type: JSON bodies carry typed text,
/// multipart bodies carry a file with its declared category.
///
/// # Errors
///
/// Returns `ApiError::CountingFailed` when the mandatory primary vendor
/// call fails. Estimator failures and malformed input never error.
#[instrument(skip(state, request), fields(correlation_id))]
pub async fn count_handler(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
    request: Request,
) -> ApiResult<Json<CountResponse>> {
    let correlation_id = context
        .as_ref()
        .map_or_else(CorrelationId::new, |ctx| ctx.correlation_id.clone());
    tracing::Span::current().record("correlation_id", tracing::field::display(&correlation_id));

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let count_request = if content_type.starts_with("application/json") {
        let payload = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
            Ok(bytes) => serde_json::from_slice::<TextPayload>(&bytes).unwrap_or_default(),
            Err(e) => {
                warn!(correlation_id = %correlation_id, error = %e, "Unreadable JSON body");
                TextPayload::default()
            }
        };
        CountRequest::text(payload.text, payload.model)
    } else if content_type.starts_with("multipart/form-data") {
        match Multipart::from_request(request, &()).await {
            Ok(multipart) => {
                let upload = read_multipart(multipart).await;
                match upload.bytes {
                    Some(bytes) => {
                        let declared_kind = upload.declared_kind.unwrap_or_else(|| {
                            FileKind::classify(
                                upload.media_type.as_deref(),
                                upload.file_name.as_deref(),
                            )
                        });
                        CountRequest::File {
                            bytes,
                            declared_kind,
                            media_type: upload.media_type,
                            file_name: upload.file_name,
                            model: upload.model,
                        }
                    }
                    // No file field: the empty short circuit, not an error
                    None => CountRequest::text("", upload.model),
                }
            }
            Err(e) => {
                warn!(correlation_id = %correlation_id, error = %e, "Unreadable multipart body");
                CountRequest::text("", None)
            }
        }
    } else {
        warn!(
            correlation_id = %correlation_id,
            content_type = %content_type,
            "Unsupported content type treated as empty input"
        );
        CountRequest::text("", None)
    };

    let count = state
        .counting
        .count(count_request, &correlation_id)
        .await
        .map_err(|source| ApiError::CountingFailed {
            source,
            correlation_id: correlation_id.clone(),
        })?;

    info!(
        correlation_id = %correlation_id,
        input_tokens = ?count.primary_tokens,
        chars = count.char_count,
        "Count request completed"
    );

    Ok(Json(CountResponse::from_count(count)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use serde_json::json;
    use std::sync::Arc;
    use tokenmeter_config::GatewayConfig;
    use tokenmeter_gateway::TokenGateway;
    use tokenmeter_vendors::TokenEstimator;
    use tokenmeter_vendors::test_mocks::{MockContentCounter, MockEstimator};
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-boundary-0001";

    fn app_with(primary: MockContentCounter, tertiary: Option<MockEstimator>) -> Router {
        let gateway = TokenGateway::new(
            Arc::new(primary),
            Arc::new(MockEstimator::with_tokens("gpt", 12)),
            tertiary.map(|t| Arc::new(t) as Arc<dyn TokenEstimator>),
            "claude-3-5-sonnet-20241022".to_string(),
            GatewayConfig { token_overhead: 7 },
        );
        routes(AppState::new(Arc::new(gateway)))
    }

    fn json_request(body: serde_json::Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri("/api")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(file_type: &str, file_name: &str, media_type: &str, payload: &[u8]) -> HttpRequest<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"fileType\"\r\n\r\n{file_type}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {media_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        HttpRequest::builder()
            .method("POST")
            .uri("/api")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn json_text_returns_all_counts() {
        let app = app_with(
            MockContentCounter::with_tokens(17),
            Some(MockEstimator::with_tokens("gemini", 10)),
        );

        let response = app
            .oneshot(json_request(json!({"text": "Hello, world!"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.get("input_tokens"), Some(&json!(10))); // 17 raw minus 7
        assert_eq!(json.get("chars"), Some(&json!(13)));
        assert_eq!(json.get("fileChars"), Some(&json!(0)));
        assert_eq!(json.get("gpt4oTokens"), Some(&json!(12)));
        assert_eq!(json.get("geminiTokens"), Some(&json!(10)));
        assert_eq!(
            json.get("model"),
            Some(&json!("claude-3-5-sonnet-20241022"))
        );
    }

    #[tokio::test]
    async fn empty_text_short_circuits_without_vendor_calls() {
        // Failing primary proves no vendor call happens
        let app = app_with(MockContentCounter::failing(), None);

        let response = app
            .oneshot(json_request(json!({"text": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.get("input_tokens"), Some(&json!(null)));
        assert_eq!(json.get("chars"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_noop_success() {
        let app = app_with(MockContentCounter::failing(), None);

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.get("input_tokens"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn pdf_upload_skips_estimators() {
        let app = app_with(
            MockContentCounter::with_tokens(907),
            Some(MockEstimator::with_tokens("gemini", 999)),
        );

        let payload = b"%PDF-1.4 fake pdf bytes";
        let response = app
            .oneshot(multipart_request("pdf", "doc.pdf", "application/pdf", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.get("input_tokens"), Some(&json!(900)));
        assert_eq!(json.get("gpt4oTokens"), Some(&json!(null)));
        assert_eq!(json.get("geminiTokens"), Some(&json!(null)));
        assert_eq!(json.get("fileChars"), Some(&json!(payload.len())));
        assert_eq!(json.get("fileName"), Some(&json!("doc.pdf")));
    }

    #[tokio::test]
    async fn text_file_reports_byte_length_as_file_chars() {
        let app = app_with(MockContentCounter::with_tokens(37), None);

        let payload = vec![b'x'; 100];
        let response = app
            .oneshot(multipart_request("text", "notes.txt", "text/plain", &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.get("fileChars"), Some(&json!(100)));
        assert_eq!(json.get("chars"), Some(&json!(100)));
        assert_eq!(json.get("gpt4oTokens"), Some(&json!(12)));
    }

    #[tokio::test]
    async fn multibyte_text_file_keeps_byte_length_in_file_chars() {
        let app = app_with(MockContentCounter::with_tokens(37), None);

        // 5 characters, 6 bytes - fileChars must stay the byte length
        let payload = "héllo".as_bytes();
        let response = app
            .oneshot(multipart_request("text", "notes.txt", "text/plain", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.get("chars"), Some(&json!(5)));
        assert_eq!(json.get("fileChars"), Some(&json!(6)));
    }

    #[tokio::test]
    async fn missing_file_type_falls_back_to_classification() {
        let app = app_with(MockContentCounter::with_tokens(127), None);

        // No fileType field at all - media type must classify it as image
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cat.png\"\r\nContent-Type: image/png\r\n\r\nfakepng\r\n--{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let json = body_json(response).await;
        // Image path: estimators skipped
        assert_eq!(json.get("input_tokens"), Some(&json!(120)));
        assert_eq!(json.get("gpt4oTokens"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn primary_failure_is_generic_500() {
        let app = app_with(MockContentCounter::failing(), None);

        let response = app
            .oneshot(json_request(json!({"text": "Hello, world!"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json.get("error"), Some(&json!("Failed to count tokens")));
        assert_eq!(
            json.as_object().map(serde_json::Map::len),
            Some(1),
            "Error body must carry only the generic message"
        );
    }

    #[tokio::test]
    async fn unsupported_content_type_is_a_noop_success() {
        let app = app_with(MockContentCounter::failing(), None);

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api")
            .header("content-type", "text/csv")
            .body(Body::from("a,b,c"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.get("input_tokens"), Some(&json!(null)));
        assert_eq!(json.get("chars"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn model_field_in_multipart_overrides_default() {
        let app = app_with(MockContentCounter::with_tokens(57), None);

        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"model\"\r\n\r\nclaude-3-opus-20240229\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\nContent-Type: text/plain\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let json = body_json(response).await;
        assert_eq!(json.get("model"), Some(&json!("claude-3-opus-20240229")));
    }
}
