//! Payload construction
//!
//! The scannable content of every generated code is a compact JSON object
//! holding whichever of `text`, `file` and `fileType` are present, always in
//! that order. Absent values are omitted, so a code built from no inputs
//! still carries the valid (if degenerate) payload `{}`.

use crate::media::MediaReference;
use serde::{Deserialize, Serialize};

/// Free-form text entered by the user, stored trimmed.
///
/// An input that is empty after trimming is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextContent(Option<String>);

impl TextContent {
    /// Build text content from raw user input
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(trimmed.to_string()))
        }
    }

    /// Absent text
    pub fn empty() -> Self {
        Self(None)
    }

    /// The trimmed text, if any
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Whether no text is present
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl From<&str> for TextContent {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// The mapping embedded in a QR code.
///
/// Field declaration order is the serialization order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Trimmed text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Hosted URL of the attached media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Declared MIME type of the attached media
    #[serde(
        default,
        rename = "fileType",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_type: Option<String>,
}

impl Payload {
    /// Assemble a payload from its inputs
    pub fn build(text: &TextContent, media: Option<&MediaReference>) -> Self {
        Self {
            text: text.as_str().map(str::to_owned),
            file: media.map(|m| m.url.clone()),
            file_type: media.map(|m| m.mime_type.clone()),
        }
    }

    /// Whether no key is present
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.file.is_none() && self.file_type.is_none()
    }

    /// Canonical compact JSON form
    pub fn to_json(&self) -> String {
        // A struct of optional strings cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Encode text and an optional media reference into the payload string.
pub fn encode(text: &TextContent, media: Option<&MediaReference>) -> String {
    Payload::build(text, media).to_json()
}
