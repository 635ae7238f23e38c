//! Styled QR code renderer

use crate::error::{Error, Result};
use crate::qr::logo::{ImageLoader, LogoBlock};
use crate::qr::shapes::{Neighbors, cell_shape};
use crate::qr::{EngineOptions, ExportFormat, OptionsPatch};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Pixel, Rgba, RgbaImage};
use qrcode::{Color as Module, QrCode};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Renders payloads into styled RGBA rasters and exports them
pub struct StyledQrEngine {
    options: EngineOptions,
    loader: Arc<dyn ImageLoader>,
    logo: Option<(String, Arc<DynamicImage>)>,
    rendered: RgbaImage,
}

impl StyledQrEngine {
    /// Build an engine and render its first frame
    pub fn new(options: EngineOptions, loader: Arc<dyn ImageLoader>) -> Result<Self> {
        let mut engine = Self {
            rendered: RgbaImage::new(options.width.max(1), options.height.max(1)),
            options,
            loader,
            logo: None,
        };
        engine.logo = engine.load_logo(engine.options.image.as_deref());
        engine.rendered = engine.draw(&engine.options)?;
        Ok(engine)
    }

    /// Current options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Last rendered raster
    pub fn image(&self) -> &RgbaImage {
        &self.rendered
    }

    /// Apply a partial update and re-render.
    ///
    /// On failure the previous options and raster are kept.
    pub fn update(&mut self, patch: OptionsPatch) -> Result<()> {
        let next = self.options.patched(patch);
        if next == self.options {
            return Ok(());
        }

        let logo_changed = next.image != self.options.image;
        let previous_logo = if logo_changed {
            let loaded = self.load_logo(next.image.as_deref());
            Some(std::mem::replace(&mut self.logo, loaded))
        } else {
            None
        };

        match self.draw(&next) {
            Ok(rendered) => {
                self.rendered = rendered;
                self.options = next;
                Ok(())
            }
            Err(err) => {
                if let Some(logo) = previous_logo {
                    self.logo = logo;
                }
                Err(err)
            }
        }
    }

    /// Encode the current raster in `format`
    pub fn raw_data(&self, format: ExportFormat) -> Result<Vec<u8>> {
        let image = match format {
            // JPEG has no alpha channel.
            ExportFormat::Jpeg => DynamicImage::ImageRgb8(
                DynamicImage::ImageRgba8(self.rendered.clone()).to_rgb8(),
            ),
            _ => DynamicImage::ImageRgba8(self.rendered.clone()),
        };

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format.image_format())
            .map_err(|e| Error::Export(format!("Failed to encode {}: {e}", format.extension())))?;
        Ok(bytes)
    }

    /// Write the current raster to `<dir>/<name>.<ext>` and return the path
    pub fn download(&self, dir: &Path, name: &str, format: ExportFormat) -> Result<PathBuf> {
        let bytes = self.raw_data(format)?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.{}", format.extension()));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    fn load_logo(&self, source: Option<&str>) -> Option<(String, Arc<DynamicImage>)> {
        let source = source.filter(|s| !s.is_empty())?;
        if let Some((cached, image)) = &self.logo {
            if cached == source {
                return Some((cached.clone(), Arc::clone(image)));
            }
        }
        match self.loader.load(source) {
            Ok(image) => Some((source.to_string(), Arc::new(image))),
            Err(err) => {
                tracing::warn!(logo = source, "Logo could not be loaded, rendering without it: {err}");
                None
            }
        }
    }

    fn draw(&self, options: &EngineOptions) -> Result<RgbaImage> {
        let code = QrCode::with_error_correction_level(
            options.data.as_bytes(),
            options.error_correction.ec_level(),
        )?;

        let count = code.width() as u32;
        let width = options.width.max(1);
        let height = options.height.max(1);
        let drawable = width.min(height).saturating_sub(2 * options.margin);
        let dot_size = drawable / count;
        if dot_size == 0 {
            return Err(Error::QrEncode(format!(
                "{count} modules do not fit on a {width}x{height} canvas with margin {}",
                options.margin
            )));
        }

        let background = Rgba(options.background.color.resolve());
        let foreground = Rgba(options.dots.color.resolve());
        let mut canvas = RgbaImage::from_pixel(width, height, background);

        let x0 = (width - count * dot_size) / 2;
        let y0 = (height - count * dot_size) / 2;

        let logo = self.logo.as_ref().and_then(|(_, image)| {
            let max_hidden = (options.image_options.image_size
                * options.error_correction.cover_ratio()
                * (count * count) as f64)
                .floor() as u32;
            LogoBlock::fit(
                (image.width(), image.height()),
                max_hidden,
                count.saturating_sub(14),
                dot_size,
            )
            .map(|block| (block, image))
        });

        let hidden = |col: u32, row: u32| {
            options.image_options.hide_background_dots
                && logo
                    .as_ref()
                    .is_some_and(|(block, _)| block.covers(col, row, count))
        };
        let drawn = |col: i64, row: i64| {
            col >= 0
                && row >= 0
                && col < count as i64
                && row < count as i64
                && code[(col as usize, row as usize)] == Module::Dark
                && !hidden(col as u32, row as u32)
        };

        for row in 0..count {
            for col in 0..count {
                let (c, r) = (col as i64, row as i64);
                if !drawn(c, r) {
                    continue;
                }
                let neighbors = Neighbors {
                    left: drawn(c - 1, r),
                    right: drawn(c + 1, r),
                    top: drawn(c, r - 1),
                    bottom: drawn(c, r + 1),
                };
                let shape = cell_shape(options.dots.shape, dot_size as f32, neighbors);
                let (px, py) = (x0 + col * dot_size, y0 + row * dot_size);

                for v in 0..dot_size {
                    for u in 0..dot_size {
                        if shape.contains(u as f32 + 0.5, v as f32 + 0.5) {
                            canvas.get_pixel_mut(px + u, py + v).blend(&foreground);
                        }
                    }
                }
            }
        }

        if let Some((block, image)) = logo {
            let inset = 2 * options.image_options.margin;
            let (w, h) = (
                block.width.saturating_sub(inset),
                block.height.saturating_sub(inset),
            );
            if w > 0 && h > 0 {
                let resized = imageops::resize(&**image, w, h, FilterType::Lanczos3);
                let x = x0 as i64 + ((count * dot_size) as i64 - w as i64) / 2;
                let y = y0 as i64 + ((count * dot_size) as i64 - h as i64) / 2;
                imageops::overlay(&mut canvas, &resized, x, y);
            } else {
                tracing::debug!(
                    margin = options.image_options.margin,
                    "Logo margin leaves no room for the logo"
                );
            }
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::DotsOptions;
    use crate::style::{Color, DotShape};

    struct SolidLogo;

    impl ImageLoader for SolidLogo {
        fn load(&self, _source: &str) -> Result<DynamicImage> {
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                64,
                64,
                Rgba([255, 0, 0, 255]),
            )))
        }
    }

    struct FailingLoader;

    impl ImageLoader for FailingLoader {
        fn load(&self, source: &str) -> Result<DynamicImage> {
            Err(Error::Image(format!("no such logo {source}")))
        }
    }

    fn options(data: &str) -> EngineOptions {
        EngineOptions {
            width: 300,
            height: 300,
            data: data.to_string(),
            ..EngineOptions::default()
        }
    }

    #[test]
    fn test_render_uses_style_colors() {
        let mut opts = options("{}");
        opts.background.color = Color::new("#00ff00");
        opts.dots = DotsOptions {
            color: Color::new("#0000ff"),
            shape: DotShape::Square,
        };
        let engine = StyledQrEngine::new(opts, Arc::new(FailingLoader)).unwrap();
        let img = engine.image();

        assert_eq!(img.dimensions(), (300, 300));
        // 21 modules * 14px = 294px, offset 3px: the top-left finder starts dark.
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*img.get_pixel(5, 5), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_invalid_background_renders_black() {
        let mut opts = options("{}");
        opts.background.color = Color::new("definitely-not-a-color");
        let engine = StyledQrEngine::new(opts, Arc::new(FailingLoader)).unwrap();
        assert_eq!(*engine.image().get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_update_rerenders_in_place() {
        let mut engine = StyledQrEngine::new(options("{}"), Arc::new(FailingLoader)).unwrap();
        let before = engine.image().clone();

        engine
            .update(OptionsPatch {
                data: Some(r#"{"text":"https://example.com"}"#.into()),
                ..OptionsPatch::default()
            })
            .unwrap();

        assert_eq!(engine.options().data, r#"{"text":"https://example.com"}"#);
        assert_ne!(engine.image(), &before);
    }

    #[test]
    fn test_oversized_payload_keeps_previous_frame() {
        let mut engine = StyledQrEngine::new(options("{}"), Arc::new(FailingLoader)).unwrap();
        let before = engine.image().clone();

        let err = engine
            .update(OptionsPatch {
                data: Some("x".repeat(5000)),
                ..OptionsPatch::default()
            })
            .unwrap_err();

        assert!(matches!(err, Error::QrEncode(_)));
        assert_eq!(engine.options().data, "{}");
        assert_eq!(engine.image(), &before);
    }

    #[test]
    fn test_logo_is_drawn_at_center() {
        let mut opts = options("{}");
        opts.image = Some("logo.png".into());
        opts.image_options.margin = 2;
        let engine = StyledQrEngine::new(opts, Arc::new(SolidLogo)).unwrap();
        assert_eq!(*engine.image().get_pixel(150, 150), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_failed_logo_renders_without_it() {
        let mut opts = options("{}");
        opts.image = Some("https://host/missing.png".into());
        let engine = StyledQrEngine::new(opts, Arc::new(FailingLoader)).unwrap();
        assert!(
            engine
                .image()
                .pixels()
                .all(|p| *p != Rgba([255, 0, 0, 255]))
        );
    }

    #[test]
    fn test_export_formats() {
        let engine = StyledQrEngine::new(options("{}"), Arc::new(FailingLoader)).unwrap();
        let png = engine.raw_data(ExportFormat::Png).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        let jpeg = engine.raw_data(ExportFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[..2], b"\xff\xd8");

        let dir = tempfile::tempdir().unwrap();
        let path = engine
            .download(dir.path(), "qrstudio-qr", ExportFormat::Png)
            .unwrap();
        assert_eq!(path, dir.path().join("qrstudio-qr.png"));
        assert!(path.exists());
    }
}
