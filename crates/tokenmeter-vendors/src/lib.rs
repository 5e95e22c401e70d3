//! External token-counting vendor clients for tokenmeter
//!
//! This crate wraps the three vendors the gateway consults as opaque
//! black-box counters:
//!
//! - [`AnthropicCounter`]: the mandatory hosted counter for text, image,
//!   and PDF document content blocks
//! - [`TiktokenEstimator`]: a local GPT tokenizer approximation
//! - [`GeminiCounter`]: a hosted best-effort counter, credential-optional
//!
//! Trait seams ([`ContentCounter`], [`TokenEstimator`]) keep the gateway
//! testable without network access.

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod test_mocks;
pub mod tiktoken;
pub mod traits;

pub use anthropic::AnthropicCounter;
pub use error::{VendorError, VendorResult};
pub use gemini::GeminiCounter;
pub use tiktoken::TiktokenEstimator;
pub use traits::{ContentCounter, ImageMediaType, TokenEstimator};
