//! Structured API error handling for the tokenmeter API
//!
//! The wire contract is deliberately terse: any primary-vendor failure
//! becomes a single generic server error with no partial data and no
//! vendor detail. Rich context (which vendor, what status) stays in logs,
//! keyed by correlation ID - it never reaches API callers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tokenmeter_common::CorrelationId;
use tracing::error;

/// Generic message returned for every counting failure
const COUNTING_FAILURE_MESSAGE: &str = "Failed to count tokens";

/// Structured API error types with correlation IDs for request tracking
#[derive(Debug, Error)]
pub enum ApiError {
    /// The mandatory primary vendor call failed.
    ///
    /// Surfaced to callers as a generic server error; the underlying
    /// vendor error is logged but never serialized.
    #[error("Token counting failed (correlation: {correlation_id})")]
    CountingFailed {
        #[source]
        source: tokenmeter_gateway::GatewayError,
        correlation_id: CorrelationId,
    },
}

impl ApiError {
    /// Get the correlation ID from any error variant
    pub const fn correlation_id(&self) -> &CorrelationId {
        match self {
            Self::CountingFailed { correlation_id, .. } => correlation_id,
        }
    }

    /// Get the HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::CountingFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Axum HTTP response implementation for `ApiError`
///
/// Always a single uniform `{"error": ...}` body - no stack traces, no
/// vendor-specific detail, no partial results.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let correlation_id = self.correlation_id().clone();

        match &self {
            Self::CountingFailed { source, .. } => {
                error!(
                    correlation_id = %correlation_id,
                    error = %source,
                    "Primary vendor count failed"
                );
            }
        }

        let mut response =
            (status, Json(json!({ "error": COUNTING_FAILURE_MESSAGE }))).into_response();

        // Correlation ID travels in a header, keeping the body contract flat
        if let Ok(header_value) = correlation_id.to_string().parse() {
            response
                .headers_mut()
                .insert("X-Correlation-ID", header_value);
        }

        response
    }
}

/// Result type for API operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;
