//! Error types for qrstudio operations

use thiserror::Error;

/// Result type alias using qrstudio's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qrstudio operations
#[derive(Error, Debug)]
pub enum Error {
    /// The declared MIME type cannot be attached to a QR code
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Asset host upload failed (transport error or non-2xx response)
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Camera access was refused or the scanner could not be initialised
    #[error("Camera access denied or QR scanner initialization failed: {0}")]
    CameraAccessDenied(String),

    /// No barcode detection capability is available on this platform
    #[error("Barcode detection is not supported on this platform")]
    DetectionUnsupported,

    /// Barcode detection failed for a single frame
    #[error("Frame detection failed: {0}")]
    FrameDetection(String),

    /// Sharing the rendered code failed
    #[error("Share failed: {0}")]
    Share(String),

    /// Exporting the rendered code to a file failed
    #[error("Export failed: {0}")]
    Export(String),

    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(String),

    /// Camera device not found
    #[error("Camera device not found: {0}")]
    CameraNotFound(String),

    /// Failed to capture frame from camera
    #[error("Frame capture failed: {0}")]
    FrameCapture(String),

    /// QR code encoding failed (including payloads over capacity)
    #[error("Failed to encode QR code: {0}")]
    QrEncode(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, response) => Error::Upload(format!(
                "asset host responded with HTTP {} {}",
                code,
                response.status_text()
            )),
            ureq::Error::Transport(transport) => Error::Upload(transport.to_string()),
        }
    }
}

impl From<qrcode::types::QrError> for Error {
    fn from(e: qrcode::types::QrError) -> Self {
        Error::QrEncode(e.to_string())
    }
}
