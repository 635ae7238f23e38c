//! Sharing rendered codes

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

/// Name given to shared image files
pub const SHARED_FILE_NAME: &str = "qr-code.png";

/// An attachment handed to a share target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    /// File name shown to the receiver
    pub name: String,
    /// MIME type of `bytes`
    pub mime_type: String,
    /// File contents
    pub bytes: Bytes,
}

impl SharedFile {
    /// PNG attachment named [`SHARED_FILE_NAME`]
    pub fn png(bytes: impl Into<Bytes>) -> Self {
        Self {
            name: SHARED_FILE_NAME.to_string(),
            mime_type: "image/png".to_string(),
            bytes: bytes.into(),
        }
    }
}

/// Everything passed to a native share dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareData {
    /// Dialog title
    pub title: String,
    /// Descriptive text
    pub text: String,
    /// Attached files
    pub files: Vec<SharedFile>,
}

/// A platform share capability
#[async_trait]
pub trait ShareTarget: Send + Sync {
    /// Hand `data` to the platform. Cancelling the dialog is an error.
    async fn share(&self, data: ShareData) -> Result<()>;
}

/// Opens a rendered image for viewing when no share target exists
pub trait Opener: Send + Sync {
    /// Show the PNG `bytes` and return where they were stored
    fn open_png(&self, bytes: &[u8]) -> Result<PathBuf>;
}

/// Persists the image to a temporary file and opens it in the system browser
#[derive(Debug, Clone, Default)]
pub struct BrowserOpener;

impl Opener for BrowserOpener {
    fn open_png(&self, bytes: &[u8]) -> Result<PathBuf> {
        let path = write_temp_png(bytes)?;
        webbrowser::open(&path.to_string_lossy())
            .map_err(|e| Error::Share(format!("Failed to open {}: {e}", path.display())))?;
        Ok(path)
    }
}

/// Write `bytes` to a `.png` file that outlives this process
pub(crate) fn write_temp_png(bytes: &[u8]) -> Result<PathBuf> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix("qrstudio-")
        .suffix(".png")
        .tempfile()?;
    file.write_all(bytes)?;
    let (_, path) = file
        .keep()
        .map_err(|e| Error::Share(format!("Failed to keep temporary image: {e}")))?;
    Ok(path)
}
