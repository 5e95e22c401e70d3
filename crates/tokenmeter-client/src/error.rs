//! Error types for the tokenmeter-client crate

use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Error type for counting requests made from the client side
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network-level failure reaching the gateway
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with an error status
    #[error("Gateway returned status {status}: {message}")]
    Gateway { status: u16, message: String },

    /// No file is selected for submission
    #[error("No file selected")]
    NoFileSelected,

    /// The chosen model is not in the available list
    #[error("Unknown model: {0}")]
    UnknownModel(String),
}
