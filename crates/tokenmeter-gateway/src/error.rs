//! Error types for the tokenmeter-gateway crate

use thiserror::Error;
use tokenmeter_vendors::VendorError;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error type for the normalization gateway
///
/// Only primary-vendor failures surface here. Secondary and tertiary
/// estimator failures are recovered locally as a null field and never
/// become a `GatewayError`.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The mandatory primary vendor call failed
    #[error("Primary token count failed: {0}")]
    PrimaryCount(#[from] VendorError),
}
