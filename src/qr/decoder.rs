//! QR code decoder using rqrr

use crate::error::{Error, Result};
use crate::scanner::{BarcodeDetector, BarcodeFormat, DetectedBarcode};
use image::{DynamicImage, GrayImage};

/// rqrr-backed barcode detector
pub struct QrDecoder {
    formats: Vec<BarcodeFormat>,
}

impl QrDecoder {
    /// Create a detector for the requested formats.
    ///
    /// Only QR codes can be read; asking for nothing else is unsupported.
    pub fn new(formats: &[BarcodeFormat]) -> Result<Self> {
        if !formats.contains(&BarcodeFormat::QrCode) {
            return Err(Error::DetectionUnsupported);
        }
        Ok(Self {
            formats: formats.to_vec(),
        })
    }

    /// Formats this detector was constructed with
    pub fn formats(&self) -> &[BarcodeFormat] {
        &self.formats
    }

    /// Decode every QR code found in a grayscale image, in detection order
    pub fn decode_gray(&self, img: GrayImage) -> Result<Vec<DetectedBarcode>> {
        let mut prepared = rqrr::PreparedImage::prepare(img);
        let grids = prepared.detect_grids();

        let mut found = Vec::with_capacity(grids.len());
        let mut last_error = None;

        for grid in grids {
            match grid.decode() {
                Ok((meta, content)) => {
                    tracing::trace!(
                        "Decoded QR: version={:?}, ecc_level={:?}, length={}",
                        meta.version,
                        meta.ecc_level,
                        content.len()
                    );
                    found.push(DetectedBarcode {
                        raw_value: content,
                        format: BarcodeFormat::QrCode,
                    });
                }
                Err(e) => {
                    tracing::debug!("Failed to decode one QR code: {:?}", e);
                    last_error = Some(e);
                }
            }
        }

        // Grids were found but none decoded: report it so the scan loop logs it.
        if found.is_empty() {
            if let Some(e) = last_error {
                return Err(Error::FrameDetection(format!("Decode failed: {:?}", e)));
            }
        }

        Ok(found)
    }
}

impl BarcodeDetector for QrDecoder {
    fn detect(&self, frame: &DynamicImage) -> Result<Vec<DetectedBarcode>> {
        self.decode_gray(frame.to_luma8())
    }
}
