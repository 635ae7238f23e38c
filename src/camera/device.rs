//! Camera device implementation

use crate::camera::{CameraConfig, PixelFormat, list_devices};
use crate::error::{Error, Result};
use crate::scanner::{FacingMode, FrameSource};
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer};
use serde::{Deserialize, Serialize};
use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// Information about a camera device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Device index (e.g., 0 for /dev/video0)
    pub index: usize,
    /// Device path (e.g., "/dev/video0")
    pub path: String,
    /// Device name as reported by the driver
    pub name: String,
    /// Driver name
    pub driver: String,
    /// Bus information
    pub bus_info: String,
}

impl CameraDevice {
    /// Whether the device name suggests it faces `facing`
    pub fn faces(&self, facing: FacingMode) -> bool {
        let name = self.name.to_lowercase();
        facing.name_hints().iter().any(|hint| name.contains(hint))
    }
}

/// Pick the device a configuration asks for out of `devices`.
///
/// An explicit name wins over an index; otherwise the first device whose
/// name hints at the preferred facing is used, then the first device.
pub fn select_device(devices: Vec<CameraDevice>, config: &CameraConfig) -> Result<CameraDevice> {
    if let Some(name) = &config.device_name {
        let wanted = name.to_lowercase();
        return devices
            .into_iter()
            .find(|d| d.name.to_lowercase().contains(&wanted))
            .ok_or_else(|| Error::CameraNotFound(format!("No device matching '{}'", name)));
    }

    if let Some(index) = config.device_index {
        return devices
            .into_iter()
            .find(|d| d.index == index)
            .ok_or_else(|| Error::CameraNotFound(format!("Device /dev/video{} not found", index)));
    }

    match devices.iter().position(|d| d.faces(config.facing)) {
        Some(pos) => Ok(devices.into_iter().nth(pos).ok_or_else(|| {
            Error::CameraNotFound("Camera list changed during selection".to_string())
        })?),
        None => {
            tracing::debug!(
                facing = ?config.facing,
                "No camera name matches the preferred facing, using the first device"
            );
            devices
                .into_iter()
                .next()
                .ok_or_else(|| Error::CameraNotFound("No cameras available".to_string()))
        }
    }
}

/// Longest wait for the driver to deliver a frame before the dequeue fails
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(2);

/// Open stream and its owning device
struct CameraInner {
    /// Memory-mapped V4L2 stream kept warm between captures
    stream: MmapStream<'static>,
    /// Owning handle to the V4L device. Drop order ensures the stream is released first.
    _device: Box<Device>,
}

impl CameraInner {
    /// Block until the next buffer is dequeued and decode it
    fn capture(&mut self, config: &CameraConfig) -> Result<DynamicImage> {
        let (buf, _meta) = self
            .stream
            .next()
            .map_err(|e| Error::FrameCapture(format!("Failed to capture: {}", e)))?;

        decode_frame(config.format, config.width, config.height, buf)
    }
}

/// An open camera producing frames until stopped
///
/// The stream is shared with the blocking capture task, so a capture that is
/// still in flight when the camera is closed finishes before the device is
/// released.
pub struct Camera {
    inner: Option<Arc<Mutex<CameraInner>>>,
    config: CameraConfig,
    info: CameraDevice,
}

impl Camera {
    /// Open a camera with the given configuration
    ///
    /// Device setup runs on the blocking thread pool.
    pub async fn open(config: CameraConfig) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::open_blocking(config))
            .await
            .map_err(|e| Error::Camera(format!("Camera open task failed: {}", e)))?
    }

    /// Open a camera with the given configuration on the calling thread
    pub fn open_blocking(config: CameraConfig) -> Result<Self> {
        let device_info = select_device(list_devices()?, &config)?;

        tracing::info!(
            "Opening camera: {} at {}",
            device_info.name,
            device_info.path
        );

        let dev = Device::new(device_info.index)
            .map_err(|e| Error::Camera(format!("Failed to open device: {}", e)))?;

        let mut fmt = dev
            .format()
            .map_err(|e| Error::Camera(format!("Failed to get format: {}", e)))?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = config.format.to_fourcc();
        let fmt = dev
            .set_format(&fmt)
            .map_err(|e| Error::Camera(format!("Failed to set format: {}", e)))?;

        let mut params = dev
            .params()
            .map_err(|e| Error::Camera(format!("Failed to get params: {}", e)))?;
        params.interval = v4l::Fraction::new(1, config.fps);
        dev.set_params(&params)
            .map_err(|e| Error::Camera(format!("Failed to set params: {}", e)))?;

        tracing::info!(
            "Camera configured: {}x{} @ {} fps ({})",
            fmt.width,
            fmt.height,
            config.fps,
            String::from_utf8_lossy(&fmt.fourcc.repr)
        );

        // The driver may have picked a different resolution than requested.
        let mut config = config;
        config.width = fmt.width;
        config.height = fmt.height;

        // SAFETY: The boxed device outlives the mmap stream and both are dropped together inside CameraInner.
        let device = Box::new(dev);
        let static_device: &'static Device =
            unsafe { mem::transmute::<&Device, &'static Device>(device.as_ref()) };

        let mut stream =
            MmapStream::with_buffers(static_device, Type::VideoCapture, config.buffer_count.max(2))
                .map_err(|e| Error::FrameCapture(format!("Failed to create stream: {}", e)))?;
        // A stalled driver fails the dequeue instead of holding the device forever.
        stream.set_timeout(CAPTURE_TIMEOUT);

        Ok(Self {
            inner: Some(Arc::new(Mutex::new(CameraInner {
                stream,
                _device: device,
            }))),
            config,
            info: device_info,
        })
    }

    /// Get camera device information
    pub fn info(&self) -> &CameraDevice {
        &self.info
    }

    /// Get camera configuration
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Whether the stream is still open
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn stream(&self) -> Result<Arc<Mutex<CameraInner>>> {
        self.inner
            .clone()
            .ok_or_else(|| Error::FrameCapture("Camera has been stopped".to_string()))
    }

    /// Capture a single frame, blocking the calling thread
    pub fn capture_frame(&mut self) -> Result<DynamicImage> {
        capture_shared(&self.stream()?, &self.config)
    }

    /// Release the stream and device
    pub fn close(&mut self) {
        if let Some(inner) = self.inner.take() {
            if Arc::strong_count(&inner) > 1 {
                tracing::debug!(
                    "Camera {} closing while a capture is in flight",
                    self.info.path
                );
            }
            tracing::info!("Camera {} released", self.info.path);
        }
    }
}

fn capture_shared(inner: &Mutex<CameraInner>, config: &CameraConfig) -> Result<DynamicImage> {
    let mut inner = inner
        .lock()
        .map_err(|_| Error::FrameCapture("Camera stream lock poisoned".to_string()))?;
    inner.capture(config)
}

#[async_trait]
impl FrameSource for Camera {
    async fn next_frame(&mut self) -> Result<DynamicImage> {
        // The dequeue waits for the driver, which paces the scan loop. Dropping
        // this future leaves the blocking task to finish on its own.
        let inner = self.stream()?;
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || capture_shared(&inner, &config))
            .await
            .map_err(|e| Error::FrameCapture(format!("Capture task failed: {}", e)))?
    }

    fn stop(&mut self) {
        self.close();
    }
}

/// Decode a raw frame buffer into an image
pub(crate) fn decode_frame(
    format: PixelFormat,
    width: u32,
    height: u32,
    buf: &[u8],
) -> Result<DynamicImage> {
    match format {
        PixelFormat::Mjpeg => image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
            .map_err(|e| Error::Image(format!("MJPEG decode failed: {}", e))),
        PixelFormat::Yuyv => yuyv_to_rgb(width, height, buf),
        PixelFormat::Rgb24 => {
            let expected = width as usize * height as usize * 3;
            ImageBuffer::from_raw(width, height, buf.get(..expected).unwrap_or(buf).to_vec())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| Error::Image("Failed to create RGB image".to_string()))
        }
    }
}

/// Convert packed YUYV 4:2:2 to RGB
fn yuyv_to_rgb(width: u32, height: u32, yuyv: &[u8]) -> Result<DynamicImage> {
    let (w, h) = (width as usize, height as usize);
    let mut rgb = vec![0u8; w * h * 3];

    let convert = |y: i32, u: i32, v: i32| {
        [
            (y + ((v * 1436) >> 10)).clamp(0, 255) as u8,
            (y - ((u * 352 + v * 731) >> 10)).clamp(0, 255) as u8,
            (y + ((u * 1814) >> 10)).clamp(0, 255) as u8,
        ]
    };

    for (pair, (src, dst)) in yuyv.chunks_exact(4).zip(rgb.chunks_exact_mut(6)).enumerate() {
        if pair >= w * h / 2 {
            break;
        }
        let u = src[1] as i32 - 128;
        let v = src[3] as i32 - 128;
        dst[..3].copy_from_slice(&convert(src[0] as i32, u, v));
        dst[3..].copy_from_slice(&convert(src[2] as i32, u, v));
    }

    ImageBuffer::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| Error::Image("Failed to create RGB image from YUYV".to_string()))
}
