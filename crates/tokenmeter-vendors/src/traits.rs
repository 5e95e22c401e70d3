//! Trait abstractions for token-counting vendors
//!
//! These seams let the gateway treat vendors as interchangeable black-box
//! counters and let tests substitute deterministic mocks.

use crate::VendorResult;
use async_trait::async_trait;

/// Image media types the primary vendor accepts
///
/// Anything outside the supported set is mapped to JPEG, matching the
/// vendor's tolerant handling of mislabeled uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageMediaType {
    /// Map a declared media type into the supported set, defaulting to JPEG
    pub fn from_declared(media_type: &str) -> Self {
        match media_type {
            "image/png" => Self::Png,
            "image/gif" => Self::Gif,
            "image/webp" => Self::Webp,
            _ => Self::Jpeg,
        }
    }

    /// The wire-format media type string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// The mandatory token counter (vendor A)
///
/// Counts tokens for text, image, and PDF document content. Any failure
/// here fails the whole counting request - there is no fallback.
#[async_trait]
pub trait ContentCounter: Send + Sync {
    /// Count tokens for plain text under the given model
    async fn count_text(&self, text: &str, model: &str) -> VendorResult<u32>;

    /// Count tokens for a base64-encoded image under the given model
    async fn count_image(
        &self,
        data_base64: &str,
        media_type: ImageMediaType,
        model: &str,
    ) -> VendorResult<u32>;

    /// Count tokens for a base64-encoded PDF document under the given model
    async fn count_pdf(&self, data_base64: &str, model: &str) -> VendorResult<u32>;
}

/// A best-effort supplementary token estimator (vendors B and C)
///
/// Estimator failures are recovered locally as a null field and never
/// surfaced to the caller as an error.
#[async_trait]
pub trait TokenEstimator: Send + Sync {
    /// Estimate the token count for plain text
    async fn estimate(&self, text: &str) -> VendorResult<u32>;

    /// Short vendor name for logging
    fn name(&self) -> &str;
}
