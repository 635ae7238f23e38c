//! Camera-based QR scanning
//!
//! [`ScannerAdapter`] asks a [`CameraProvider`] for a frame stream, then runs a
//! [`ScanLoop`] that feeds each frame to a [`BarcodeDetector`] and reports
//! decoded values to the caller until stopped.

mod scan_loop;

pub use scan_loop::{CancelHandle, ScanLoop, ScanStats};

use crate::error::{Error, Result};
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Barcode symbologies a detector can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    /// QR code
    QrCode,
}

/// One barcode found in a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBarcode {
    /// Decoded text content
    pub raw_value: String,
    /// Symbology of the barcode
    pub format: BarcodeFormat,
}

/// Finds and decodes barcodes in still frames
pub trait BarcodeDetector: Send + Sync {
    /// Decode every barcode in `frame`, in detection order
    fn detect(&self, frame: &DynamicImage) -> Result<Vec<DetectedBarcode>>;
}

/// A live stream of camera frames
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame
    async fn next_frame(&mut self) -> Result<DynamicImage>;

    /// Stop the stream and release the device
    fn stop(&mut self);
}

/// Grants access to a camera
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Open a camera, preferring one that faces `facing`
    async fn request(&self, facing: FacingMode) -> Result<Box<dyn FrameSource>>;
}

/// Which way the preferred camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, pointed away from the user
    #[default]
    Environment,
    /// Front camera, pointed at the user
    User,
}

impl FacingMode {
    /// Parse from a user-provided string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "environment" | "rear" | "back" => Some(FacingMode::Environment),
            "user" | "front" => Some(FacingMode::User),
            _ => None,
        }
    }

    /// Device name fragments suggesting this facing
    pub fn name_hints(self) -> &'static [&'static str] {
        match self {
            FacingMode::Environment => &["back", "rear", "environment", "world"],
            FacingMode::User => &["front", "user", "facetime", "integrated"],
        }
    }
}

/// The detector available on this build, if any
pub fn platform_detector() -> Option<Arc<dyn BarcodeDetector>> {
    #[cfg(feature = "detector")]
    {
        match crate::qr::QrDecoder::new(&[BarcodeFormat::QrCode]) {
            Ok(decoder) => Some(Arc::new(decoder)),
            Err(err) => {
                tracing::warn!("QR detector unavailable: {err}");
                None
            }
        }
    }

    #[cfg(not(feature = "detector"))]
    {
        None
    }
}

/// Lifecycle of a scanning session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerState {
    /// Not started yet
    Idle,
    /// No barcode detector is available
    Unsupported,
    /// Waiting for camera access
    Requesting,
    /// Frames are being decoded
    Scanning,
    /// Camera access failed
    Failed(String),
    /// Torn down after scanning
    Stopped,
}

impl ScannerState {
    /// Whether the session can no longer scan
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScannerState::Unsupported | ScannerState::Failed(_) | ScannerState::Stopped
        )
    }
}

impl fmt::Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScannerState::Idle => f.write_str("idle"),
            ScannerState::Unsupported => f.write_str("unsupported"),
            ScannerState::Requesting => f.write_str("requesting"),
            ScannerState::Scanning => f.write_str("scanning"),
            ScannerState::Failed(reason) => write!(f, "failed ({reason})"),
            ScannerState::Stopped => f.write_str("stopped"),
        }
    }
}

/// Single-use scanning session over a camera and a detector
pub struct ScannerAdapter {
    detector: Option<Arc<dyn BarcodeDetector>>,
    camera: Arc<dyn CameraProvider>,
    facing: FacingMode,
    state: ScannerState,
    handle: Option<CancelHandle>,
}

impl ScannerAdapter {
    /// Create a session. `detector` is `None` when the platform cannot decode barcodes.
    pub fn new(
        detector: Option<Arc<dyn BarcodeDetector>>,
        camera: Arc<dyn CameraProvider>,
    ) -> Self {
        Self {
            detector,
            camera,
            facing: FacingMode::Environment,
            state: ScannerState::Idle,
            handle: None,
        }
    }

    /// Prefer a camera facing `facing` instead of the rear one
    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = facing;
        self
    }

    /// Current state
    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Open the camera and start decoding frames.
    ///
    /// `on_decode` receives the first decoded value of every frame that has
    /// one. Errors leave the session in a terminal state.
    pub async fn start<F>(&mut self, on_decode: F) -> Result<()>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        if self.state != ScannerState::Idle {
            return Err(Error::Other(format!(
                "Scanner cannot start while {}",
                self.state
            )));
        }

        let Some(detector) = self.detector.clone() else {
            self.state = ScannerState::Unsupported;
            tracing::error!("QR code detection is not supported on this platform");
            return Err(Error::DetectionUnsupported);
        };

        self.state = ScannerState::Requesting;
        tracing::info!(facing = ?self.facing, "Requesting camera access");

        let source = match self.camera.request(self.facing).await {
            Ok(source) => source,
            Err(err) => {
                tracing::error!("Error accessing camera: {err}");
                let reason = err.to_string();
                self.state = ScannerState::Failed(reason.clone());
                return Err(Error::CameraAccessDenied(reason));
            }
        };

        self.handle = Some(ScanLoop::start(source, detector, on_decode));
        self.state = ScannerState::Scanning;
        Ok(())
    }

    /// Cancel the loop and wait for the camera to be released
    pub async fn stop(&mut self) -> Option<ScanStats> {
        let handle = self.handle.take()?;
        let stats = handle.join().await;
        self.state = ScannerState::Stopped;
        Some(stats)
    }
}
