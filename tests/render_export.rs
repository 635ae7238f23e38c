use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::DynamicImage;

use qrstudio::config::RenderOptions;
use qrstudio::qr::ImageLoader;
use qrstudio::render::{
    Command, CommandOutcome, Frame, Opener, RenderAdapter, ShareData, ShareTarget, Surface,
};
use qrstudio::{DotShape, Error, ExportFormat, Result, StyleConfig, TextContent, encode};

struct Offline;

impl ImageLoader for Offline {
    fn load(&self, source: &str) -> Result<DynamicImage> {
        Err(Error::Image(format!("offline: {source}")))
    }
}

struct Hidden;

impl Surface for Hidden {
    fn present(&mut self, _frame: Frame<'_>) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingShare {
    shared: Mutex<Vec<ShareData>>,
    fail: bool,
}

#[async_trait]
impl ShareTarget for RecordingShare {
    async fn share(&self, data: ShareData) -> Result<()> {
        self.shared.lock().expect("share lock").push(data);
        if self.fail {
            return Err(Error::Share("user cancelled".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingOpener {
    opened: Mutex<Vec<usize>>,
}

impl Opener for RecordingOpener {
    fn open_png(&self, bytes: &[u8]) -> Result<PathBuf> {
        self.opened.lock().expect("opener lock").push(bytes.len());
        Ok(PathBuf::from("/tmp/qrstudio-test.png"))
    }
}

fn adapter(download_dir: PathBuf) -> RenderAdapter {
    let options = RenderOptions {
        width: 400,
        height: 400,
        margin: 40,
        download_dir,
        ..RenderOptions::default()
    };
    RenderAdapter::new(options, Box::new(Hidden)).with_loader(Arc::new(Offline))
}

fn payload() -> String {
    encode(&TextContent::new("https://example.com"), None)
}

#[cfg(feature = "detector")]
#[test]
fn rendered_code_scans_back_to_the_payload() {
    use qrstudio::QrDecoder;
    use qrstudio::scanner::{BarcodeDetector, BarcodeFormat};

    let dir = tempfile::tempdir().expect("tempdir");
    let mut adapter = adapter(dir.path().to_path_buf());
    let style = StyleConfig::default().with_dot_shape(DotShape::Square);
    adapter.apply(&payload(), &style).expect("render");

    let image = adapter.engine().expect("mounted").image().clone();
    let decoder = QrDecoder::new(&[BarcodeFormat::QrCode]).expect("decoder");
    let found = decoder
        .detect(&DynamicImage::ImageRgba8(image))
        .expect("detect");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].raw_value, r#"{"text":"https://example.com"}"#);
}

#[tokio::test]
async fn download_writes_named_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut adapter = adapter(dir.path().to_path_buf());
    adapter
        .apply(&payload(), &StyleConfig::default())
        .expect("render");

    let outcome = adapter.execute(adapter.download_command()).await.expect("download");
    let expected = dir.path().join("qrstudio-qr.png");
    assert_eq!(outcome, CommandOutcome::Downloaded(expected.clone()));

    let saved = image::open(&expected).expect("saved png");
    assert_eq!((saved.width(), saved.height()), (400, 400));

    let outcome = adapter
        .execute(Command::Download {
            name: "poster".into(),
            format: ExportFormat::Jpeg,
        })
        .await
        .expect("jpeg download");
    assert_eq!(
        outcome,
        CommandOutcome::Downloaded(dir.path().join("poster.jpeg"))
    );
}

#[tokio::test]
async fn download_failure_propagates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").expect("write blocker");

    let mut adapter = adapter(blocker);
    adapter
        .apply(&payload(), &StyleConfig::default())
        .expect("render");

    assert!(adapter.execute(adapter.download_command()).await.is_err());
}

#[tokio::test]
async fn share_attaches_png_with_descriptive_text() {
    let target = Arc::new(RecordingShare::default());
    let dir = tempfile::tempdir().expect("tempdir");
    let mut adapter = adapter(dir.path().to_path_buf()).with_share_target(target.clone());
    adapter
        .apply(&payload(), &StyleConfig::default())
        .expect("render");

    let outcome = adapter.execute(Command::Share).await.expect("share");
    assert_eq!(outcome, CommandOutcome::Shared);

    let shared = target.shared.lock().expect("share lock");
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].title, "Scan this QR Code");
    assert_eq!(shared[0].text, "Generated with qrstudio");
    assert_eq!(shared[0].files.len(), 1);
    assert_eq!(shared[0].files[0].name, "qr-code.png");
    assert_eq!(shared[0].files[0].mime_type, "image/png");
    assert_eq!(&shared[0].files[0].bytes[..4], b"\x89PNG");
}

#[tokio::test]
async fn share_failure_is_swallowed() {
    let target = Arc::new(RecordingShare {
        fail: true,
        ..RecordingShare::default()
    });
    let dir = tempfile::tempdir().expect("tempdir");
    let mut adapter = adapter(dir.path().to_path_buf()).with_share_target(target);
    adapter
        .apply(&payload(), &StyleConfig::default())
        .expect("render");

    let outcome = adapter.execute(Command::Share).await.expect("no error surfaced");
    assert_eq!(outcome, CommandOutcome::ShareFailed);
}

#[tokio::test]
async fn share_without_target_opens_the_image() {
    let opener = Arc::new(RecordingOpener::default());
    let dir = tempfile::tempdir().expect("tempdir");
    let mut adapter = adapter(dir.path().to_path_buf()).with_opener(opener.clone());
    adapter
        .apply(&payload(), &StyleConfig::default())
        .expect("render");

    let outcome = adapter.execute(Command::Share).await.expect("open");
    assert_eq!(
        outcome,
        CommandOutcome::Opened(PathBuf::from("/tmp/qrstudio-test.png"))
    );
    let opened = opener.opened.lock().expect("opener lock");
    assert_eq!(opened.len(), 1);
    assert!(opened[0] > 0);
}

#[test]
fn oversized_payload_is_reported_by_the_renderer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut adapter = adapter(dir.path().to_path_buf());
    let huge = encode(&TextContent::new("x".repeat(4000)), None);

    let err = adapter
        .apply(&huge, &StyleConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::QrEncode(_)));
    assert!(!adapter.is_ready());
}
