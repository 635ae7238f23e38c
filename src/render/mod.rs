//! Render/export adapter
//!
//! [`RenderAdapter`] owns the styled engine, keeps it in sync with the
//! current payload and [`StyleConfig`], presents each render on a
//! [`Surface`] and runs the [`Command`]s issued against it.

mod share;
mod surface;

pub use share::{BrowserOpener, Opener, SHARED_FILE_NAME, ShareData, ShareTarget, SharedFile};
pub use surface::{Frame, PngSurface, Surface, TerminalSurface};

use crate::config::RenderOptions;
use crate::error::Result;
use crate::qr::{
    BackgroundOptions, DefaultImageLoader, DotsOptions, EngineOptions, ExportFormat, ImageLoader,
    ImageOptions, OptionsPatch, StyledQrEngine,
};
use crate::style::StyleConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// Operations available on a mounted adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Save the current code as `<download_dir>/<name>.<format>`
    Download {
        /// File name without extension
        name: String,
        /// Image format
        format: ExportFormat,
    },
    /// Share the current code, or open it when sharing is unavailable
    Share,
}

/// What a command ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// File written
    Downloaded(PathBuf),
    /// Handed to the share target
    Shared,
    /// No share target; opened from a temporary file
    Opened(PathBuf),
    /// The image could not be produced
    Aborted,
    /// Sharing or opening failed
    ShareFailed,
    /// Nothing has been rendered yet
    Skipped,
}

enum AdapterState {
    Uninitialized,
    Ready(StyledQrEngine),
}

/// Keeps a styled QR engine in sync with payload and style changes
pub struct RenderAdapter {
    options: RenderOptions,
    loader: Arc<dyn ImageLoader>,
    surface: Box<dyn Surface>,
    share_target: Option<Arc<dyn ShareTarget>>,
    opener: Arc<dyn Opener>,
    state: AdapterState,
}

impl RenderAdapter {
    /// Adapter rendering with `options` onto `surface`
    pub fn new(options: RenderOptions, surface: Box<dyn Surface>) -> Self {
        Self {
            options,
            loader: Arc::new(DefaultImageLoader::default()),
            surface,
            share_target: None,
            opener: Arc::new(BrowserOpener),
            state: AdapterState::Uninitialized,
        }
    }

    /// Use `loader` to fetch logos
    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Share through `target` instead of opening the image
    pub fn with_share_target(mut self, target: Arc<dyn ShareTarget>) -> Self {
        self.share_target = Some(target);
        self
    }

    /// Open images with `opener` when no share target is set
    pub fn with_opener(mut self, opener: Arc<dyn Opener>) -> Self {
        self.opener = opener;
        self
    }

    /// Render settings
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Whether an engine has been mounted
    pub fn is_ready(&self) -> bool {
        matches!(self.state, AdapterState::Ready(_))
    }

    /// The mounted engine
    pub fn engine(&self) -> Option<&StyledQrEngine> {
        match &self.state {
            AdapterState::Ready(engine) => Some(engine),
            AdapterState::Uninitialized => None,
        }
    }

    /// Download command using the configured name and format
    pub fn download_command(&self) -> Command {
        Command::Download {
            name: self.options.download_name.clone(),
            format: self.options.download_format,
        }
    }

    /// Render `payload` with `style`.
    ///
    /// The first call builds the engine; later calls update it in place.
    pub fn apply(&mut self, payload: &str, style: &StyleConfig) -> Result<()> {
        if let AdapterState::Uninitialized = self.state {
            let options = self.engine_options(payload, style);
            let engine = StyledQrEngine::new(options, Arc::clone(&self.loader))?;
            tracing::debug!(
                width = engine.options().width,
                height = engine.options().height,
                "QR engine mounted"
            );
            self.state = AdapterState::Ready(engine);
        } else if let AdapterState::Ready(engine) = &mut self.state {
            engine.update(OptionsPatch {
                data: Some(payload.to_string()),
                dots: Some(DotsOptions {
                    color: style.dot_color.clone(),
                    shape: style.dot_shape,
                }),
                background: Some(BackgroundOptions {
                    color: style.background_color.clone(),
                }),
                image: Some(style.logo.clone()),
                ..OptionsPatch::default()
            })?;
        }

        if let AdapterState::Ready(engine) = &self.state {
            self.surface.present(Frame {
                image: engine.image(),
                data: &engine.options().data,
                error_correction: engine.options().error_correction,
            })?;
        }
        Ok(())
    }

    /// Run a command against the mounted engine.
    ///
    /// Download errors are returned; share problems are logged and
    /// reported through the outcome only.
    pub async fn execute(&self, command: Command) -> Result<CommandOutcome> {
        let AdapterState::Ready(engine) = &self.state else {
            tracing::debug!(?command, "No QR code rendered yet, ignoring command");
            return Ok(CommandOutcome::Skipped);
        };

        match command {
            Command::Download { name, format } => {
                let path = engine.download(&self.options.download_dir, &name, format)?;
                tracing::info!("QR code saved to {}", path.display());
                Ok(CommandOutcome::Downloaded(path))
            }
            Command::Share => Ok(self.share(engine).await),
        }
    }

    async fn share(&self, engine: &StyledQrEngine) -> CommandOutcome {
        let bytes = match engine.raw_data(ExportFormat::Png) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!("Failed to generate QR code image: {err}");
                return CommandOutcome::Aborted;
            }
        };

        match &self.share_target {
            Some(target) => {
                let data = ShareData {
                    title: self.options.share_title.clone(),
                    text: self.options.share_text.clone(),
                    files: vec![SharedFile::png(bytes)],
                };
                match target.share(data).await {
                    Ok(()) => CommandOutcome::Shared,
                    Err(err) => {
                        tracing::error!("Error sharing: {err}");
                        CommandOutcome::ShareFailed
                    }
                }
            }
            None => match self.opener.open_png(&bytes) {
                Ok(path) => {
                    tracing::info!("Opened QR code from {}", path.display());
                    CommandOutcome::Opened(path)
                }
                Err(err) => {
                    tracing::error!("Error opening QR code: {err}");
                    CommandOutcome::ShareFailed
                }
            },
        }
    }

    fn engine_options(&self, payload: &str, style: &StyleConfig) -> EngineOptions {
        EngineOptions {
            width: self.options.width,
            height: self.options.height,
            margin: self.options.margin,
            data: payload.to_string(),
            error_correction: self.options.error_correction,
            dots: DotsOptions {
                color: style.dot_color.clone(),
                shape: style.dot_shape,
            },
            background: BackgroundOptions {
                color: style.background_color.clone(),
            },
            image: style.logo.clone().filter(|logo| !logo.is_empty()),
            image_options: ImageOptions {
                margin: self.options.logo_margin,
                image_size: self.options.logo_size,
                ..ImageOptions::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::style::DotShape;
    use image::DynamicImage;
    use std::sync::Mutex;

    struct NoLogos;

    impl ImageLoader for NoLogos {
        fn load(&self, source: &str) -> Result<DynamicImage> {
            Err(Error::Image(format!("offline: {source}")))
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Surface for Recorder {
        fn present(&mut self, frame: Frame<'_>) -> Result<()> {
            self.0.lock().unwrap().push(frame.data.to_string());
            Ok(())
        }
    }

    fn adapter(recorder: &Recorder) -> RenderAdapter {
        let options = RenderOptions {
            download_dir: std::env::temp_dir(),
            ..RenderOptions::default()
        };
        RenderAdapter::new(options, Box::new(recorder.clone())).with_loader(Arc::new(NoLogos))
    }

    #[test]
    fn test_first_apply_mounts_then_updates() {
        let recorder = Recorder::default();
        let mut adapter = adapter(&recorder);
        assert!(!adapter.is_ready());

        adapter.apply("{}", &StyleConfig::default()).unwrap();
        assert!(adapter.is_ready());

        let style = StyleConfig::default().with_dot_shape(DotShape::Square);
        adapter.apply(r#"{"text":"hi"}"#, &style).unwrap();

        let engine = adapter.engine().unwrap();
        assert_eq!(engine.options().dots.shape, DotShape::Square);
        assert_eq!(engine.options().data, r#"{"text":"hi"}"#);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["{}".to_string(), r#"{"text":"hi"}"#.to_string()]
        );
    }

    #[test]
    fn test_engine_options_follow_render_settings() {
        let recorder = Recorder::default();
        let mut adapter = adapter(&recorder);
        adapter.apply("{}", &StyleConfig::default()).unwrap();

        let options = adapter.engine().unwrap().options();
        assert_eq!((options.width, options.height), (200, 200));
        assert_eq!(options.image_options.margin, 20);
        assert_eq!(options.image_options.cross_origin.as_deref(), Some("anonymous"));
    }

    #[tokio::test]
    async fn test_commands_before_mount_are_skipped() {
        let recorder = Recorder::default();
        let adapter = adapter(&recorder);
        assert_eq!(
            adapter.execute(Command::Share).await.unwrap(),
            CommandOutcome::Skipped
        );
        assert_eq!(
            adapter.execute(adapter.download_command()).await.unwrap(),
            CommandOutcome::Skipped
        );
    }
}
