//! qrstudio - styled QR code generator with media attachments and a camera scanner
//!
//! Text and uploaded media (images, video, audio, PDF) are combined into a
//! compact JSON payload and rendered as a styled QR code that can be saved
//! or shared. A V4L2-backed scanner reads codes back from a live camera.
//!
//! # Features
//!
//! - **Media attachments**: files are uploaded to an asset host and embedded by URL
//! - **Styled rendering**: dot shapes, colors and a centered logo overlay
//! - **Export**: PNG, JPEG and WebP downloads plus share/open support
//! - **Scanning**: cancellable per-frame QR detection over V4L2 cameras
//!
//! # Example
//!
//! ```no_run
//! use qrstudio::render::PngSurface;
//! use qrstudio::{QrStudio, StudioConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StudioConfig::load(None)?;
//!     let mut studio = QrStudio::from_config(&config, Box::new(PngSurface::new("preview.png")));
//!
//!     studio.set_text("https://example.com");
//!     studio.render()?;
//!     studio.download().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod payload;
pub mod qr;
pub mod render;
pub mod scanner;
pub mod session;
pub mod style;

#[cfg(feature = "camera")]
#[cfg_attr(docsrs, doc(cfg(feature = "camera")))]
pub mod camera;

// Re-exports for convenience
pub use error::{Error, Result};

#[cfg(feature = "camera")]
pub use camera::{Camera, CameraConfig, CameraDevice, V4lCameraProvider};

pub use config::{
    CameraOptions, LogRotation, LoggingOptions, RenderOptions, StudioConfig, UploadOptions,
};
pub use media::{LocalFile, MediaCategory, MediaReference, MediaResolver, PreviewKind};
pub use payload::{Payload, TextContent, encode};
pub use qr::{ErrorCorrection, ExportFormat, StyledQrEngine};
pub use render::{Command, CommandOutcome, RenderAdapter};
pub use scanner::{FacingMode, ScannerAdapter, ScannerState};
pub use session::QrStudio;
pub use style::{Color, DotShape, StyleConfig};

#[cfg(feature = "detector")]
pub use qr::QrDecoder;
