//! Normalization gateway for tokenmeter
//!
//! This crate is the core of the system: it decides, from an incoming
//! request's payload kind and declared file category, which vendor calls
//! to make, in what encoding, and how to merge the heterogeneous vendor
//! responses into one uniform [`TokenCount`], including the error and
//! default-value policy.
//!
//! The dispatch policy, in priority order:
//! 1. PDF file: base64 document block to the primary vendor only
//! 2. Image file: base64 image block to the primary vendor only
//! 3. Text/unknown file: lossy UTF-8 decode, then handled as text
//! 4. Text: primary count plus two concurrent best-effort estimates
//!
//! The primary vendor is mandatory in every branch; the estimators are
//! best-effort and degrade to null independently.

pub mod error;
pub mod service;
pub mod types;

pub use error::{GatewayError, GatewayResult};
pub use service::{CountingService, TokenGateway};
pub use types::{CountRequest, FileKind, TokenCount};
