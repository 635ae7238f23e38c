//! Logo loading and placement

use crate::error::{Error, Result};
use image::DynamicImage;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Largest logo download accepted
const MAX_LOGO_BYTES: u64 = 10 * 1024 * 1024;

/// Fetches logo images by URL or path
pub trait ImageLoader: Send + Sync {
    /// Load and decode the image at `source`
    fn load(&self, source: &str) -> Result<DynamicImage>;
}

/// Loads `http(s)://` URLs over the network and everything else from disk
pub struct DefaultImageLoader {
    agent: ureq::Agent,
}

impl DefaultImageLoader {
    /// Create a loader with the given network timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for DefaultImageLoader {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ImageLoader for DefaultImageLoader {
    fn load(&self, source: &str) -> Result<DynamicImage> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let response = self
                .agent
                .get(source)
                .call()
                .map_err(|e| Error::Image(format!("Failed to fetch logo {source}: {e}")))?;

            let mut bytes = Vec::new();
            response
                .into_reader()
                .take(MAX_LOGO_BYTES)
                .read_to_end(&mut bytes)?;

            return Ok(image::load_from_memory(&bytes)?);
        }

        let path = source.strip_prefix("file://").unwrap_or(source);
        image::open(Path::new(path))
            .map_err(|e| Error::Image(format!("Failed to open logo {path}: {e}")))
    }
}

/// Module block hidden behind the logo and the logo's drawn size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoBlock {
    /// Hidden columns (odd)
    pub hide_x: u32,
    /// Hidden rows (odd)
    pub hide_y: u32,
    /// Logo width in pixels, before the logo margin is removed
    pub width: u32,
    /// Logo height in pixels, before the logo margin is removed
    pub height: u32,
}

impl LogoBlock {
    /// Fit a logo of `original` size into at most `max_hidden` modules,
    /// keeping its aspect ratio and an odd number of modules on each axis
    /// so the block stays centered on the matrix.
    pub fn fit(
        original: (u32, u32),
        max_hidden: u32,
        max_axis: u32,
        dot_size: u32,
    ) -> Option<Self> {
        let (orig_w, orig_h) = original;
        if orig_w == 0 || orig_h == 0 || max_hidden == 0 || dot_size == 0 {
            return None;
        }

        let k = orig_h as f64 / orig_w as f64;
        let mut hide_x = ((max_hidden as f64 / k).sqrt().floor() as u32).max(1);
        if max_axis > 0 && max_axis < hide_x {
            hide_x = max_axis;
        }
        if hide_x % 2 == 0 {
            hide_x -= 1;
        }
        let mut width = hide_x * dot_size;
        let mut hide_y = 1 + 2 * (((hide_x as f64 * k - 1.0) / 2.0).ceil().max(0.0) as u32);
        let mut height = (width as f64 * k).round() as u32;

        let axis_overflow = max_axis > 0 && max_axis < hide_y;
        if hide_y * hide_x > max_hidden || axis_overflow {
            if axis_overflow {
                hide_y = max_axis;
                if hide_y % 2 == 0 {
                    hide_y -= 1;
                }
            } else {
                hide_y = hide_y.saturating_sub(2).max(1);
            }
            height = hide_y * dot_size;
            hide_x = 1 + 2 * (((hide_y as f64 / k - 1.0) / 2.0).ceil().max(0.0) as u32);
            width = (height as f64 / k).round() as u32;
        }

        Some(Self {
            hide_x,
            hide_y,
            width,
            height,
        })
    }

    /// Whether module `(col, row)` of a `count`-wide matrix lies under the block
    pub fn covers(&self, col: u32, row: u32, count: u32) -> bool {
        let (col, row, count) = (col as i64, row as i64, count as i64);
        let (hx, hy) = (self.hide_x as i64, self.hide_y as i64);
        2 * col >= count - hx && 2 * col < count + hx && 2 * row >= count - hy && 2 * row < count + hy
    }
}
