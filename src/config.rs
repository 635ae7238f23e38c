//! qrstudio runtime configuration handling

#[cfg(feature = "camera")]
use crate::camera::{CameraConfig, PixelFormat};
use crate::error::{Error, Result};
use crate::qr::{ErrorCorrection, ExportFormat};
#[cfg(feature = "camera")]
use crate::scanner::FacingMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure read from disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Asset host settings
    pub upload: UploadOptions,
    /// Rendering and export settings
    pub render: RenderOptions,
    /// Camera capture configuration overrides
    pub camera: CameraOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl StudioConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrstudio.toml / qrstudio.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrstudio.toml", "qrstudio.yaml", "qrstudio.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrstudio");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        self.upload.apply_env_overrides();
        self.render.apply_env_overrides();
        self.camera.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// Produce a fully resolved camera configuration ready to open the V4L2 device.
    #[cfg(feature = "camera")]
    pub fn camera_config(&self) -> Result<CameraConfig> {
        self.camera.to_camera_config()
    }
}

/// Asset host credentials and endpoint.
///
/// Missing identifiers are not validated: uploads made without them are
/// rejected by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Base URL of the upload API
    pub api_base: String,
    /// Asset host (cloud) identifier
    pub cloud_name: Option<String>,
    /// Unsigned upload preset identifier
    pub upload_preset: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            api_base: "https://api.cloudinary.com".to_string(),
            cloud_name: None,
            upload_preset: None,
            timeout_secs: 60,
        }
    }
}

impl UploadOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(base) = env::var("QRSTUDIO_UPLOAD_API") {
            self.api_base = base;
        }
        if let Ok(name) = env::var("QRSTUDIO_CLOUD_NAME") {
            self.cloud_name = Some(name);
        }
        if let Ok(preset) = env::var("QRSTUDIO_UPLOAD_PRESET") {
            self.upload_preset = Some(preset);
        }
        if let Ok(timeout) = env::var("QRSTUDIO_UPLOAD_TIMEOUT") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.timeout_secs = parsed.max(1);
            }
        }
    }
}

/// Canvas, logo and export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Outer margin in pixels
    pub margin: u32,
    /// Error correction level
    pub error_correction: ErrorCorrection,
    /// Padding in pixels around the logo
    pub logo_margin: u32,
    /// Logo size as a fraction of the recoverable area
    pub logo_size: f64,
    /// Directory downloads are written to
    pub download_dir: PathBuf,
    /// Base file name of downloads
    pub download_name: String,
    /// Download image format
    pub download_format: ExportFormat,
    /// Title attached to shared codes
    pub share_title: String,
    /// Description attached to shared codes
    pub share_text: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            margin: 0,
            error_correction: ErrorCorrection::Quartile,
            logo_margin: 20,
            logo_size: 0.3,
            download_dir: PathBuf::from("."),
            download_name: "qrstudio-qr".to_string(),
            download_format: ExportFormat::Png,
            share_title: "Scan this QR Code".to_string(),
            share_text: "Generated with qrstudio".to_string(),
        }
    }
}

impl RenderOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(width) = env::var("QRSTUDIO_WIDTH") {
            if let Ok(parsed) = width.parse::<u32>() {
                self.width = parsed;
            }
        }
        if let Ok(height) = env::var("QRSTUDIO_HEIGHT") {
            if let Ok(parsed) = height.parse::<u32>() {
                self.height = parsed;
            }
        }
        if let Ok(dir) = env::var("QRSTUDIO_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }
        if let Ok(format) = env::var("QRSTUDIO_DOWNLOAD_FORMAT") {
            if let Ok(parsed) = format.parse::<ExportFormat>() {
                self.download_format = parsed;
            }
        }
        if let Ok(level) = env::var("QRSTUDIO_ERROR_CORRECTION") {
            if let Ok(parsed) = level.parse::<ErrorCorrection>() {
                self.error_correction = parsed;
            }
        }
    }
}

/// User-friendly camera overrides that are merged on top of the camera defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Override for the numeric camera index (e.g. `/dev/video2`).
    pub device_index: Option<usize>,
    /// Override for the camera name substring match.
    pub device_name: Option<String>,
    /// Preferred facing (`environment` or `user`).
    pub facing: Option<String>,
    /// Override for desired frame width in pixels.
    pub width: Option<u32>,
    /// Override for desired frame height in pixels.
    pub height: Option<u32>,
    /// Override for desired frames per second.
    pub fps: Option<u32>,
    /// Override for pixel format string (mjpeg/yuyv/rgb24).
    pub format: Option<String>,
}

impl CameraOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("QRSTUDIO_CAMERA_DEVICE") {
            self.device_name = Some(name);
            self.device_index = None;
        }
        if let Ok(index) = env::var("QRSTUDIO_CAMERA_INDEX") {
            if let Ok(parsed) = index.parse::<usize>() {
                self.device_index = Some(parsed);
                self.device_name = None;
            }
        }
        if let Ok(facing) = env::var("QRSTUDIO_CAMERA_FACING") {
            self.facing = Some(facing);
        }
        if let Ok(fps) = env::var("QRSTUDIO_CAMERA_FPS") {
            self.fps = fps.parse::<u32>().ok();
        }
        if let Ok(format) = env::var("QRSTUDIO_CAMERA_FORMAT") {
            self.format = Some(format);
        }
    }

    /// Merge overrides onto the default camera configuration.
    #[cfg(feature = "camera")]
    pub fn to_camera_config(&self) -> Result<CameraConfig> {
        let mut config = CameraConfig::default();

        if let Some(name) = &self.device_name {
            config.device_name = Some(name.clone());
            config.device_index = None;
        }

        if let Some(index) = self.device_index {
            config.device_index = Some(index);
            if self.device_name.is_none() {
                config.device_name = None;
            }
        }

        if let Some(facing) = &self.facing {
            config.facing = FacingMode::parse(facing).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown camera facing '{facing}'. Use environment or user"
                ))
            })?;
        }

        if let Some(width) = self.width {
            config.width = width;
        }

        if let Some(height) = self.height {
            config.height = height;
        }

        if let Some(fps) = self.fps {
            config.fps = fps.max(1);
        }

        if let Some(format) = &self.format {
            config.format = PixelFormat::parse(format).ok_or_else(|| {
                Error::Config(format!(
                    "Unknown pixel format '{}'. Use mjpeg, yuyv, or rgb24",
                    format
                ))
            })?;
        }

        Ok(config)
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRSTUDIO_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in stderr logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRSTUDIO_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("QRSTUDIO_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("QRSTUDIO_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("QRSTUDIO_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}
