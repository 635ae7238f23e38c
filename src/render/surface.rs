//! Places rendered codes are presented on

use crate::error::{Error, Result};
use crate::qr::ErrorCorrection;
use image::RgbaImage;
use qrcode::QrCode;
use qrcode::render::unicode;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A freshly rendered code
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Styled raster
    pub image: &'a RgbaImage,
    /// Payload encoded in the raster
    pub data: &'a str,
    /// Error correction the raster was encoded with
    pub error_correction: ErrorCorrection,
}

/// Visual output a render adapter is attached to
pub trait Surface: Send + Sync {
    /// Show `frame`, replacing whatever was shown before
    fn present(&mut self, frame: Frame<'_>) -> Result<()>;
}

/// Writes every frame to a PNG file
#[derive(Debug, Clone)]
pub struct PngSurface {
    path: PathBuf,
}

impl PngSurface {
    /// Surface writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Surface for PngSurface {
    fn present(&mut self, frame: Frame<'_>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        frame
            .image
            .save_with_format(&self.path, image::ImageFormat::Png)
            .map_err(|e| Error::Export(format!("Failed to write {}: {e}", self.path.display())))
    }
}

/// Draws a monochrome preview with Unicode half blocks
pub struct TerminalSurface<W: Write + Send + Sync> {
    out: W,
}

impl TerminalSurface<std::io::Stdout> {
    /// Surface printing to stdout
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send + Sync> TerminalSurface<W> {
    /// Surface printing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Give back the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + Sync> Surface for TerminalSurface<W> {
    fn present(&mut self, frame: Frame<'_>) -> Result<()> {
        let code = QrCode::with_error_correction_level(
            frame.data.as_bytes(),
            frame.error_correction.ec_level(),
        )?;
        let art = code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Dark)
            .light_color(unicode::Dense1x2::Light)
            .build();
        writeln!(self.out, "{art}")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(image: &RgbaImage) -> Frame<'_> {
        Frame {
            image,
            data: "{}",
            error_correction: ErrorCorrection::Quartile,
        }
    }

    #[test]
    fn test_png_surface_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = PngSurface::new(dir.path().join("preview/qr.png"));
        let image = RgbaImage::new(8, 8);

        surface.present(frame(&image)).unwrap();
        let written = image::open(surface.path()).unwrap();
        assert_eq!((written.width(), written.height()), (8, 8));
    }

    #[test]
    fn test_terminal_surface_prints_blocks() {
        let mut surface = TerminalSurface::new(Vec::new());
        let image = RgbaImage::new(1, 1);

        surface.present(frame(&image)).unwrap();
        let text = String::from_utf8(surface.into_inner()).unwrap();
        assert!(text.lines().count() > 10);
        assert!(text.contains('█') || text.contains('▀') || text.contains('▄'));
    }
}
