//! Request and result value objects for the normalization gateway
//!
//! Both types are request-scoped values: nothing here persists beyond a
//! single request/response cycle.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Declared file category guiding which vendor capability to invoke
///
/// This is a client-supplied hint; `Unknown` is handled as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
    Text,
    #[default]
    Unknown,
}

impl FileKind {
    /// Classify a file by declared media type, falling back to the
    /// filename suffix when the media type is absent or unhelpful
    pub fn classify(media_type: Option<&str>, file_name: Option<&str>) -> Self {
        if let Some(media_type) = media_type {
            if media_type.starts_with("image/") {
                return Self::Image;
            }
            if media_type == "application/pdf" {
                return Self::Pdf;
            }
            if media_type.starts_with("text/") {
                return Self::Text;
            }
        }

        let suffix = file_name
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match suffix.as_deref() {
            Some("jpg" | "jpeg" | "png" | "gif" | "webp") => Self::Image,
            Some("pdf") => Self::Pdf,
            Some("txt" | "md" | "csv" | "json" | "xml" | "html" | "log") => Self::Text,
            _ => Self::Unknown,
        }
    }

    /// Parse the wire-format hint, defaulting to `Unknown`
    pub fn from_wire(value: &str) -> Self {
        match value {
            "image" => Self::Image,
            "pdf" => Self::Pdf,
            "text" => Self::Text,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Text => "text",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// A single token-counting request
///
/// Exactly one payload kind per request. A missing `model` means the
/// gateway substitutes the configured default model identifier.
#[derive(Debug, Clone)]
pub enum CountRequest {
    /// Typed text payload
    Text {
        text: String,
        model: Option<String>,
    },
    /// Uploaded file payload with its declared category
    File {
        bytes: Bytes,
        declared_kind: FileKind,
        media_type: Option<String>,
        file_name: Option<String>,
        model: Option<String>,
    },
}

impl CountRequest {
    /// Build a plain-text request
    pub fn text(text: impl Into<String>, model: Option<String>) -> Self {
        Self::Text {
            text: text.into(),
            model,
        }
    }

    /// The caller-chosen model, if any
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Text { model, .. } | Self::File { model, .. } => model.as_deref(),
        }
    }
}

/// The uniform result every counting request normalizes into
///
/// `secondary_tokens` and `tertiary_tokens` are populated only for text
/// payloads; image and PDF payloads skip the estimators by vendor policy.
/// `primary_tokens` is `None` only for the empty-input short circuit,
/// where no vendor was called at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    /// Overhead-corrected count from the mandatory primary vendor
    pub primary_tokens: Option<u32>,
    /// Best-effort local GPT tokenizer estimate
    pub secondary_tokens: Option<u32>,
    /// Best-effort hosted gemini estimate
    pub tertiary_tokens: Option<u32>,
    /// Character count of text input, or raw byte length for binary files
    pub char_count: usize,
    /// Raw byte length of an uploaded file; zero for typed-text requests.
    /// Differs from `char_count` for any multibyte text file.
    pub file_bytes: usize,
    /// The model identifier the primary count was performed against
    pub model: String,
    /// Original file name for file payloads
    pub file_name: Option<String>,
}

impl TokenCount {
    /// The empty result used when input is empty and no vendor is called
    pub fn empty(model: &str) -> Self {
        Self {
            primary_tokens: None,
            secondary_tokens: None,
            tertiary_tokens: None,
            char_count: 0,
            file_bytes: 0,
            model: model.to_string(),
            file_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_media_type_first() {
        assert_eq!(
            FileKind::classify(Some("image/png"), Some("weird.pdf")),
            FileKind::Image
        );
        assert_eq!(
            FileKind::classify(Some("application/pdf"), None),
            FileKind::Pdf
        );
        assert_eq!(
            FileKind::classify(Some("text/plain"), None),
            FileKind::Text
        );
    }

    #[test]
    fn falls_back_to_filename_suffix() {
        assert_eq!(
            FileKind::classify(Some("application/octet-stream"), Some("photo.JPG")),
            FileKind::Image
        );
        assert_eq!(
            FileKind::classify(None, Some("report.pdf")),
            FileKind::Pdf
        );
        assert_eq!(
            FileKind::classify(None, Some("notes.md")),
            FileKind::Text
        );
    }

    #[test]
    fn unclassifiable_files_are_unknown() {
        assert_eq!(FileKind::classify(None, Some("data.bin")), FileKind::Unknown);
        assert_eq!(FileKind::classify(None, None), FileKind::Unknown);
    }

    #[test]
    fn wire_hint_parses_known_values() {
        assert_eq!(FileKind::from_wire("image"), FileKind::Image);
        assert_eq!(FileKind::from_wire("pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_wire("text"), FileKind::Text);
        assert_eq!(FileKind::from_wire("whatever"), FileKind::Unknown);
    }

    #[test]
    fn empty_result_has_no_counts() {
        let empty = TokenCount::empty("claude-3-5-sonnet-20241022");
        assert_eq!(empty.primary_tokens, None);
        assert_eq!(empty.char_count, 0);
    }
}
