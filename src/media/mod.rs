//! Media attachments
//!
//! Local files are classified by their declared MIME type, uploaded to an
//! external asset host, and replaced by a [`MediaReference`] (hosted URL plus
//! MIME type) that the payload encoder embeds in the QR code.

mod host;
mod resolver;

pub use host::{AssetHost, CloudinaryHost, UploadRequest, multipart_body};
pub use resolver::{MediaResolver, MediaSlot, SlotTicket, UploadStatus};

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A hosted asset standing in for an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// Stable hosted URL
    pub url: String,
    /// Declared MIME type of the original file
    pub mime_type: String,
}

impl MediaReference {
    /// Create a reference from its parts
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
        }
    }

    /// How the referenced media would be previewed
    pub fn preview_kind(&self) -> PreviewKind {
        PreviewKind::for_mime(&self.mime_type)
    }
}

/// Content category of an attachment, derived from its MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    /// `image/*`
    Image,
    /// `video/*`
    Video,
    /// `audio/*`
    Audio,
    /// `application/pdf`
    Document,
}

impl MediaCategory {
    /// Classify a declared MIME type, rejecting anything that cannot be attached
    pub fn from_mime(mime_type: &str) -> Result<Self> {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Ok(Self::Image)
        } else if mime.starts_with("video/") {
            Ok(Self::Video)
        } else if mime.starts_with("audio/") {
            Ok(Self::Audio)
        } else if mime == "application/pdf" {
            Ok(Self::Document)
        } else {
            Err(Error::UnsupportedFileType(mime_type.to_string()))
        }
    }

    /// Resource type segment used by the asset host
    pub fn resource_type(self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Audio => "audio",
            MediaCategory::Document => "raw",
        }
    }

    /// Human-readable name
    pub fn as_str(self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Audio => "audio",
            MediaCategory::Document => "document",
        }
    }
}

/// Preview presentation for an uploaded attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    /// Inline picture
    Image,
    /// Video player
    Video,
    /// Audio player
    Audio,
    /// Embedded PDF viewer
    Pdf,
    /// Nothing can be shown
    Unsupported,
}

impl PreviewKind {
    /// Pick the preview for a MIME type
    pub fn for_mime(mime_type: &str) -> Self {
        match MediaCategory::from_mime(mime_type) {
            Ok(MediaCategory::Image) => PreviewKind::Image,
            Ok(MediaCategory::Video) => PreviewKind::Video,
            Ok(MediaCategory::Audio) => PreviewKind::Audio,
            Ok(MediaCategory::Document) => PreviewKind::Pdf,
            Err(_) => PreviewKind::Unsupported,
        }
    }
}

/// A file picked by the user, held in memory until uploaded
#[derive(Debug, Clone)]
pub struct LocalFile {
    /// File name sent to the asset host
    pub name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// File contents
    pub bytes: Bytes,
}

impl LocalFile {
    /// Wrap in-memory contents
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension unless overridden
    pub async fn from_path(path: &Path, mime_override: Option<&str>) -> Result<Self> {
        let contents = tokio::fs::read(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {e}", path.display()),
            ))
        })?;

        let mime_type = match mime_override {
            Some(mime) => mime.to_string(),
            None => mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(name, mime_type, contents))
    }

    /// Category of this file, or `UnsupportedFileType`
    pub fn category(&self) -> Result<MediaCategory> {
        MediaCategory::from_mime(&self.mime_type)
    }
}
