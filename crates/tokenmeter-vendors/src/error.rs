//! Error types for the tokenmeter-vendors crate

use thiserror::Error;

/// Result type alias for vendor operations
pub type VendorResult<T> = Result<T, VendorError>;

/// Error type for external vendor calls
///
/// Vendor errors never carry response bodies verbatim - upstream detail
/// stays in logs, not in values that might reach API callers.
#[derive(Error, Debug)]
pub enum VendorError {
    /// Network-level failure reaching the vendor
    #[error("Network error calling {vendor}: {message}")]
    Network { vendor: String, message: String },

    /// Vendor returned a non-success HTTP status
    #[error("{vendor} returned status {status}")]
    UpstreamStatus { vendor: String, status: u16 },

    /// Vendor response could not be decoded into the expected shape
    #[error("Unexpected {vendor} response: {message}")]
    UnexpectedResponse { vendor: String, message: String },

    /// Local tokenizer failed to load or encode
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

impl VendorError {
    /// Create a network error for the named vendor
    pub fn network(vendor: &str, err: &reqwest::Error) -> Self {
        Self::Network {
            vendor: vendor.to_string(),
            message: err.to_string(),
        }
    }

    /// Create an unexpected-response error for the named vendor
    pub fn unexpected(vendor: &str, message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            vendor: vendor.to_string(),
            message: message.into(),
        }
    }
}
