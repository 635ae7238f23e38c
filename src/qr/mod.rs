//! Styled QR rendering and QR decoding
//!
//! [`StyledQrEngine`] turns a payload string plus visual options into an RGBA
//! raster: module shapes, colors and a centered logo. [`QrDecoder`] reads QR
//! codes back out of camera frames.

#[cfg(feature = "detector")]
mod decoder;
mod engine;
mod logo;
mod shapes;

#[cfg(feature = "detector")]
pub use decoder::QrDecoder;
pub use engine::StyledQrEngine;
pub use logo::{DefaultImageLoader, ImageLoader, LogoBlock};

use crate::style::{Color, DotShape};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Error correction level of generated codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    /// ~7% recovery
    Low,
    /// ~15% recovery
    Medium,
    /// ~25% recovery
    #[default]
    Quartile,
    /// ~30% recovery
    High,
}

impl ErrorCorrection {
    pub(crate) fn ec_level(self) -> qrcode::EcLevel {
        match self {
            ErrorCorrection::Low => qrcode::EcLevel::L,
            ErrorCorrection::Medium => qrcode::EcLevel::M,
            ErrorCorrection::Quartile => qrcode::EcLevel::Q,
            ErrorCorrection::High => qrcode::EcLevel::H,
        }
    }

    /// Share of modules that may be covered by a logo at this level
    pub fn cover_ratio(self) -> f64 {
        match self {
            ErrorCorrection::Low => 0.07,
            ErrorCorrection::Medium => 0.15,
            ErrorCorrection::Quartile => 0.25,
            ErrorCorrection::High => 0.30,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "medium" => Ok(Self::Medium),
            "q" | "quartile" => Ok(Self::Quartile),
            "h" | "high" => Ok(Self::High),
            other => Err(format!(
                "Unknown error correction level '{other}', expected l, m, q or h"
            )),
        }
    }
}

/// Module appearance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotsOptions {
    /// Fill color of dark modules
    pub color: Color,
    /// Module shape
    #[serde(rename = "type")]
    pub shape: DotShape,
}

/// Canvas background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundOptions {
    /// Fill color of the whole canvas
    pub color: Color,
}

/// Logo placement options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// CORS mode requested when the logo is fetched from another origin
    pub cross_origin: Option<String>,
    /// Padding in pixels between the logo and the surrounding modules
    pub margin: u32,
    /// Logo size as a fraction of the recoverable area
    pub image_size: f64,
    /// Leave modules under the logo undrawn
    pub hide_background_dots: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            cross_origin: Some("anonymous".to_string()),
            margin: 20,
            image_size: 0.3,
            hide_background_dots: true,
        }
    }
}

/// Full construction options for [`StyledQrEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Outer margin in pixels around the module matrix
    pub margin: u32,
    /// Encoded content
    pub data: String,
    /// Error correction level
    pub error_correction: ErrorCorrection,
    /// Module appearance
    pub dots: DotsOptions,
    /// Background appearance
    pub background: BackgroundOptions,
    /// Optional logo URL or path
    pub image: Option<String>,
    /// Logo placement
    pub image_options: ImageOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            margin: 0,
            data: String::new(),
            error_correction: ErrorCorrection::default(),
            dots: DotsOptions {
                color: Color::new("#000000"),
                shape: DotShape::default(),
            },
            background: BackgroundOptions {
                color: Color::new("#ffffff"),
            },
            image: None,
            image_options: ImageOptions::default(),
        }
    }
}

/// Partial options applied by [`StyledQrEngine::update`]; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsPatch {
    /// New canvas width
    pub width: Option<u32>,
    /// New canvas height
    pub height: Option<u32>,
    /// New content
    pub data: Option<String>,
    /// New module appearance
    pub dots: Option<DotsOptions>,
    /// New background
    pub background: Option<BackgroundOptions>,
    /// New logo; `Some(None)` removes it
    pub image: Option<Option<String>>,
    /// New logo placement
    pub image_options: Option<ImageOptions>,
}

impl EngineOptions {
    /// Merge a patch into a copy of these options
    pub fn patched(&self, patch: OptionsPatch) -> Self {
        let mut next = self.clone();
        if let Some(width) = patch.width {
            next.width = width;
        }
        if let Some(height) = patch.height {
            next.height = height;
        }
        if let Some(data) = patch.data {
            next.data = data;
        }
        if let Some(dots) = patch.dots {
            next.dots = dots;
        }
        if let Some(background) = patch.background {
            next.background = background;
        }
        if let Some(image) = patch.image {
            next.image = image.filter(|s| !s.is_empty());
        }
        if let Some(image_options) = patch.image_options {
            next.image_options = image_options;
        }
        next
    }
}

/// Image formats the engine can export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// JPEG (alpha is flattened)
    Jpeg,
    /// Lossless WebP
    Webp,
}

impl ExportFormat {
    /// File extension
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Webp => "webp",
        }
    }

    /// MIME type
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Webp => "image/webp",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            ExportFormat::Png => image::ImageFormat::Png,
            ExportFormat::Jpeg => image::ImageFormat::Jpeg,
            ExportFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(format!(
                "Unsupported export format '{other}', expected png, jpeg or webp"
            )),
        }
    }
}
