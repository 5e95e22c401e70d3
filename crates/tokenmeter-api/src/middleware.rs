//! Request middleware for the tokenmeter API
//!
//! Attaches a correlation ID to every request: taken from the incoming
//! `X-Correlation-ID` header when present, freshly generated otherwise.
//! The ID is stored as a request extension and echoed on the response.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tokenmeter_common::CorrelationId;

const CORRELATION_HEADER: &str = "X-Correlation-ID";

/// Per-request context carried as an axum extension
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation ID linking this request across logs and services
    pub correlation_id: CorrelationId,
}

/// Middleware that attaches a correlation ID to the request and response
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(CorrelationId::new, CorrelationId::from);

    request.extensions_mut().insert(RequestContext {
        correlation_id: correlation_id.clone(),
    });

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response
            .headers_mut()
            .insert(CORRELATION_HEADER, header_value);
    }

    response
}
