use crate::middleware::RequestContext;
use axum::{Extension, Json, Router, routing::get};
use serde_json::json;
use tracing::{info, instrument};
use tokenmeter_common::CorrelationId;

pub fn routes() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check endpoint with correlation ID tracking
#[instrument(fields(correlation_id))]
async fn health_check(context: Option<Extension<RequestContext>>) -> Json<serde_json::Value> {
    let correlation_id = context
        .as_ref()
        .map_or_else(CorrelationId::new, |ctx| ctx.correlation_id.clone());

    tracing::Span::current().record("correlation_id", tracing::field::display(&correlation_id));

    info!(
        correlation_id = %correlation_id,
        "Health check request"
    );

    Json(json!({
        "status": "healthy",
        "service": "tokenmeter-api",
        "correlation_id": correlation_id.to_string()
    }))
}
