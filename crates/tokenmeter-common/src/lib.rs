//! Common utilities and patterns shared across Tokenmeter crates
//!
//! This crate provides shared functionality to reduce duplication across
//! the various Tokenmeter components.

pub mod error;
pub mod init;
pub mod tracing;

pub use error::ErrorContext;
pub use init::initialize_environment;
pub use tracing::CorrelationId;
