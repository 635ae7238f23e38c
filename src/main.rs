//! qrstudio command-line entrypoint

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use qrstudio::media::LocalFile;
use qrstudio::render::{CommandOutcome, Frame, PngSurface, Surface, TerminalSurface};
use qrstudio::{
    Color, DotShape, ErrorCorrection, ExportFormat, QrStudio, StudioConfig, logging,
};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "qrstudio",
    version,
    about = "Styled QR code generator with media attachments and a camera scanner"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to qrstudio.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a QR code from text and an optional attachment, then save it
    Generate(GenerateArgs),
    /// Scan QR codes from a camera and print their contents
    Scan(ScanArgs),
    /// List detected cameras and exit
    ListCameras,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Text or link to embed
    text: Option<String>,

    /// Image, video, audio or PDF file to upload and embed by URL
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Override the MIME type guessed from the attachment's extension
    #[arg(long, value_name = "MIME")]
    file_type: Option<String>,

    /// Image to upload and draw at the center of the code
    #[arg(long, value_name = "PATH")]
    logo: Option<PathBuf>,

    /// Color of the dots (hex, rgb() or a color name)
    #[arg(long, value_name = "COLOR")]
    dot_color: Option<String>,

    /// Background color
    #[arg(long, value_name = "COLOR")]
    background: Option<String>,

    /// Dot shape: rounded, dots, classy, classy-rounded, square or extra-rounded
    #[arg(long, value_name = "SHAPE")]
    dot_shape: Option<DotShape>,

    /// Error correction level: l, m, q or h
    #[arg(long, value_name = "LEVEL")]
    error_correction: Option<ErrorCorrection>,

    /// Canvas width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Directory the code is saved to
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// File name without extension
    #[arg(long)]
    name: Option<String>,

    /// Export format: png, jpeg or webp
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Print a preview of the code to the terminal
    #[arg(long)]
    preview: bool,

    /// Also write the styled preview to this PNG file
    #[arg(long, value_name = "PATH", conflicts_with = "preview")]
    preview_png: Option<PathBuf>,

    /// Share the code (opens it in the browser when no share target exists)
    #[arg(long)]
    share: bool,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Stop after the first decoded code
    #[arg(long)]
    once: bool,

    /// Override camera by name (takes precedence over config file)
    #[arg(long, value_name = "NAME")]
    device: Option<String>,

    /// Override camera by index (/dev/videoN)
    #[arg(long, value_name = "INDEX")]
    device_index: Option<usize>,

    /// Preferred camera facing: environment or user
    #[arg(long, value_name = "FACING")]
    facing: Option<String>,
}

/// Surface for runs that only save files
struct NoPreview;

impl Surface for NoPreview {
    fn present(&mut self, _frame: Frame<'_>) -> qrstudio::Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::ListCameras = cli.command {
        return list_cameras();
    }

    let mut config =
        StudioConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    logging::init(&config.logging)?;

    match cli.command {
        Commands::Generate(args) => generate(&mut config, args).await,
        Commands::Scan(args) => scan(&mut config, args).await,
        Commands::ListCameras => list_cameras(),
    }
}

async fn generate(config: &mut StudioConfig, args: GenerateArgs) -> anyhow::Result<()> {
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if let Some(level) = args.error_correction {
        config.render.error_correction = level;
    }
    if let Some(dir) = &args.out_dir {
        config.render.download_dir = dir.clone();
    }
    if let Some(name) = &args.name {
        config.render.download_name = name.clone();
    }
    if let Some(format) = args.format {
        config.render.download_format = format;
    }

    let surface: Box<dyn Surface> = if args.preview {
        Box::new(TerminalSurface::stdout())
    } else if let Some(path) = &args.preview_png {
        Box::new(PngSurface::new(path))
    } else {
        Box::new(NoPreview)
    };

    let mut studio = QrStudio::from_config(config, surface);
    studio.set_text(args.text.as_deref().unwrap_or_default());

    if let Some(path) = &args.file {
        let file = read_file(path, args.file_type.as_deref()).await?;
        // Failed uploads leave the code without an attachment.
        match studio.attach_file(Some(file)).await {
            Ok(Some(reference)) => println!(
                "Attached {} ({:?} preview)",
                reference.url,
                reference.preview_kind()
            ),
            Ok(None) => {}
            Err(err) => eprintln!("Attachment skipped: {err}"),
        }
    }

    if let Some(path) = &args.logo {
        let file = read_file(path, None).await?;
        if let Err(err) = studio.set_logo(Some(file)).await {
            eprintln!("Logo skipped: {err}");
        }
    }

    let mut style = studio.style().clone();
    if let Some(color) = &args.dot_color {
        style = style.with_dot_color(Color::new(color.as_str()));
    }
    if let Some(color) = &args.background {
        style = style.with_background_color(Color::new(color.as_str()));
    }
    if let Some(shape) = args.dot_shape {
        style = style.with_dot_shape(shape);
    }
    studio.set_style(style);

    info!(payload = %studio.payload(), "Generating QR code");
    studio.render().context("Failed to render QR code")?;

    if let CommandOutcome::Downloaded(path) = studio.download().await? {
        println!("Saved {}", path.display());
    }

    if args.share {
        match studio.share().await? {
            CommandOutcome::Shared => println!("Shared QR code"),
            CommandOutcome::Opened(path) => println!("Opened {}", path.display()),
            outcome => info!(?outcome, "QR code was not shared"),
        }
    }

    Ok(())
}

async fn read_file(path: &Path, mime_override: Option<&str>) -> anyhow::Result<LocalFile> {
    LocalFile::from_path(path, mime_override)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(feature = "camera")]
async fn scan(config: &mut StudioConfig, args: ScanArgs) -> anyhow::Result<()> {
    use qrstudio::scanner::{ScannerAdapter, platform_detector};
    use qrstudio::{FacingMode, V4lCameraProvider};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    if let Some(name) = &args.device {
        config.camera.device_name = Some(name.clone());
        config.camera.device_index = None;
    }
    if let Some(index) = args.device_index {
        config.camera.device_index = Some(index);
        config.camera.device_name = None;
    }
    let facing = match &args.facing {
        Some(value) => match FacingMode::parse(value) {
            Some(facing) => facing,
            None => bail!("Unknown camera facing '{value}'. Use environment or user"),
        },
        None => config.camera_config()?.facing,
    };

    let camera_config = config.camera_config()?;
    info!(?camera_config, "Starting QR scanner");

    let provider = Arc::new(V4lCameraProvider::new(camera_config));
    let mut scanner = ScannerAdapter::new(platform_detector(), provider).with_facing(facing);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    scanner
        .start(move |value| {
            let _ = tx.send(value);
        })
        .await?;

    println!("Scanning... press Ctrl+C to stop");

    loop {
        tokio::select! {
            decoded = rx.recv() => match decoded {
                Some(value) => {
                    println!("{value}");
                    if args.once {
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(stats) = scanner.stop().await {
        info!(
            frames = stats.frames,
            decoded = stats.decoded,
            errors = stats.errors,
            "Scanner stopped"
        );
    }
    Ok(())
}

#[cfg(not(feature = "camera"))]
async fn scan(_config: &mut StudioConfig, _args: ScanArgs) -> anyhow::Result<()> {
    bail!("qrstudio was built without the `camera` feature")
}

#[cfg(feature = "camera")]
fn list_cameras() -> anyhow::Result<()> {
    let devices = qrstudio::camera::list_devices()?;
    println!("Discovered cameras:");
    for dev in devices {
        println!("  [{}] {} ({})", dev.index, dev.name, dev.path);
    }
    Ok(())
}

#[cfg(not(feature = "camera"))]
fn list_cameras() -> anyhow::Result<()> {
    bail!("qrstudio was built without the `camera` feature")
}
