use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma};
use tokio::sync::mpsc;

use qrstudio::scanner::{
    BarcodeDetector, BarcodeFormat, CameraProvider, DetectedBarcode, FacingMode, FrameSource,
    ScanLoop, ScannerAdapter, ScannerState,
};
use qrstudio::{Error, Result};

/// Frame whose single pixel tells the detector what to report.
fn marker(value: u8) -> Result<DynamicImage> {
    Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(
        1,
        1,
        Luma([value]),
    )))
}

fn found(values: &[&str]) -> Vec<DetectedBarcode> {
    values
        .iter()
        .map(|v| DetectedBarcode {
            raw_value: v.to_string(),
            format: BarcodeFormat::QrCode,
        })
        .collect()
}

/// 0 = nothing, 1 = "alpha", 2 = "bravo" then "charlie", anything else fails.
struct MarkerDetector;

impl BarcodeDetector for MarkerDetector {
    fn detect(&self, frame: &DynamicImage) -> Result<Vec<DetectedBarcode>> {
        match frame.to_luma8().get_pixel(0, 0).0[0] {
            0 => Ok(Vec::new()),
            1 => Ok(found(&["alpha"])),
            2 => Ok(found(&["bravo", "charlie"])),
            other => Err(Error::FrameDetection(format!("marker {other}"))),
        }
    }
}

#[derive(Clone, Default)]
struct Probe {
    served: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
}

struct ScriptedSource {
    frames: VecDeque<Result<DynamicImage>>,
    probe: Probe,
}

impl ScriptedSource {
    fn new(frames: Vec<Result<DynamicImage>>, probe: &Probe) -> Box<Self> {
        Box::new(Self {
            frames: frames.into(),
            probe: probe.clone(),
        })
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> Result<DynamicImage> {
        match self.frames.pop_front() {
            Some(frame) => {
                self.probe.served.fetch_add(1, Ordering::SeqCst);
                frame
            }
            // A camera with nothing new to show
            None => std::future::pending().await,
        }
    }

    fn stop(&mut self) {
        self.probe.stopped.store(true, Ordering::SeqCst);
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handler_fires_once_per_decoding_frame_and_loop_continues() {
    let probe = Probe::default();
    let source = ScriptedSource::new(
        vec![
            marker(1),
            marker(0),
            Err(Error::FrameCapture("dropped frame".into())),
            marker(2),
            marker(7),
            marker(1),
        ],
        &probe,
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ScanLoop::start(source, Arc::new(MarkerDetector), move |value| {
        tx.send(value).expect("receiver alive");
    });

    let mut decoded = Vec::new();
    for _ in 0..3 {
        let value = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("decode in time")
            .expect("channel open");
        decoded.push(value);
    }
    assert_eq!(decoded, ["alpha", "bravo", "alpha"]);
    assert_eq!(probe.served.load(Ordering::SeqCst), 6);
    assert!(!probe.stopped.load(Ordering::SeqCst));

    let stats = handle.join().await;
    assert_eq!(stats.frames, 6);
    assert_eq!(stats.decoded, 3);
    assert_eq!(stats.errors, 2);
    assert!(probe.stopped.load(Ordering::SeqCst));
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_is_idempotent() {
    let probe = Probe::default();
    let handle = ScanLoop::start(
        ScriptedSource::new(Vec::new(), &probe),
        Arc::new(MarkerDetector),
        |_| {},
    );

    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());

    let stats = handle.join().await;
    assert_eq!(stats.frames, 0);
    assert!(probe.stopped.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_handle_stops_the_camera() {
    let probe = Probe::default();
    let handle = ScanLoop::start(
        ScriptedSource::new(vec![marker(0)], &probe),
        Arc::new(MarkerDetector),
        |_| {},
    );

    let served = probe.served.clone();
    wait_until(move || served.load(Ordering::SeqCst) == 1).await;
    drop(handle);

    let stopped = probe.stopped.clone();
    wait_until(move || stopped.load(Ordering::SeqCst)).await;
}

struct ScriptedCamera {
    requests: AtomicUsize,
    frames: std::sync::Mutex<Option<Box<ScriptedSource>>>,
}

#[async_trait]
impl CameraProvider for ScriptedCamera {
    async fn request(&self, facing: FacingMode) -> Result<Box<dyn FrameSource>> {
        assert_eq!(facing, FacingMode::Environment);
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.frames.lock().expect("camera lock").take() {
            Some(source) => Ok(source as Box<dyn FrameSource>),
            None => Err(Error::Camera("Permission denied".into())),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn adapter_scans_until_stopped() {
    let probe = Probe::default();
    let camera = Arc::new(ScriptedCamera {
        requests: AtomicUsize::new(0),
        frames: std::sync::Mutex::new(Some(ScriptedSource::new(
            vec![marker(0), marker(1)],
            &probe,
        ))),
    });
    let mut scanner = ScannerAdapter::new(Some(Arc::new(MarkerDetector)), camera.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    scanner
        .start(move |value| {
            let _ = tx.send(value);
        })
        .await
        .expect("scanner starts");
    assert_eq!(scanner.state(), &ScannerState::Scanning);

    let value = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("decode in time");
    assert_eq!(value.as_deref(), Some("alpha"));

    let stats = scanner.stop().await.expect("loop was running");
    assert_eq!(stats.decoded, 1);
    assert_eq!(scanner.state(), &ScannerState::Stopped);
    assert!(probe.stopped.load(Ordering::SeqCst));
    assert_eq!(camera.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn denied_camera_fails_the_session() {
    let camera = Arc::new(ScriptedCamera {
        requests: AtomicUsize::new(0),
        frames: std::sync::Mutex::new(None),
    });
    let mut scanner = ScannerAdapter::new(Some(Arc::new(MarkerDetector)), camera.clone());

    let err = scanner.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, Error::CameraAccessDenied(_)));
    assert!(
        err.to_string()
            .starts_with("Camera access denied or QR scanner initialization failed")
    );
    assert!(matches!(scanner.state(), ScannerState::Failed(_)));

    // No automatic retry
    assert!(scanner.start(|_| {}).await.is_err());
    assert_eq!(camera.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_detector_reports_unsupported_without_camera() {
    let camera = Arc::new(ScriptedCamera {
        requests: AtomicUsize::new(0),
        frames: std::sync::Mutex::new(None),
    });
    let mut scanner = ScannerAdapter::new(None, camera.clone());

    let err = scanner.start(|_| {}).await.unwrap_err();
    assert!(matches!(err, Error::DetectionUnsupported));
    assert_eq!(scanner.state(), &ScannerState::Unsupported);
    assert_eq!(camera.requests.load(Ordering::SeqCst), 0);
}

/// A camera that has been unplugged: every capture fails at once.
struct UnpluggedSource {
    probe: Probe,
}

#[async_trait]
impl FrameSource for UnpluggedSource {
    async fn next_frame(&mut self) -> Result<DynamicImage> {
        self.probe.served.fetch_add(1, Ordering::SeqCst);
        Err(Error::FrameCapture("No such device".into()))
    }

    fn stop(&mut self) {
        self.probe.stopped.store(true, Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn failing_capture_backs_off_instead_of_spinning() {
    let probe = Probe::default();
    let handle = ScanLoop::start(
        Box::new(UnpluggedSource {
            probe: probe.clone(),
        }),
        Arc::new(MarkerDetector),
        |_| {},
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    let stats = handle.join().await;

    // 20ms doubling to a 500ms cap allows about eight attempts in two seconds.
    assert!(stats.errors >= 3, "too few attempts: {stats:?}");
    assert!(stats.errors <= 12, "capture retried without backoff: {stats:?}");
    assert_eq!(stats.frames, stats.errors);
    assert_eq!(stats.decoded, 0);
    assert!(probe.stopped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_capture_backoff() {
    let probe = Probe::default();
    let handle = ScanLoop::start(
        Box::new(UnpluggedSource {
            probe: probe.clone(),
        }),
        Arc::new(MarkerDetector),
        |_| {},
    );

    // Attempts land at 0, 20, 60, 140, 300, 620, 1120, 1620, 2120 and 2620ms,
    // so the loop is part way through a 500ms delay here.
    tokio::time::sleep(Duration::from_millis(2650)).await;
    let started = tokio::time::Instant::now();
    let stats = handle.join().await;

    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(stats.errors > 0);
    assert!(probe.stopped.load(Ordering::SeqCst));
}

/// A driver that never delivers: capture blocks a pool thread until released.
struct StalledSource {
    gate: Arc<std::sync::Mutex<std::sync::mpsc::Receiver<()>>>,
    probe: Probe,
}

#[async_trait]
impl FrameSource for StalledSource {
    async fn next_frame(&mut self) -> Result<DynamicImage> {
        self.probe.served.fetch_add(1, Ordering::SeqCst);
        let gate = Arc::clone(&self.gate);
        tokio::task::spawn_blocking(move || {
            let _ = gate.lock().expect("gate lock").recv();
            Err(Error::FrameCapture("Capture timed out".into()))
        })
        .await
        .map_err(|e| Error::FrameCapture(e.to_string()))?
    }

    fn stop(&mut self) {
        self.probe.stopped.store(true, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_capture_does_not_block_teardown() {
    let probe = Probe::default();
    let (release, gate) = std::sync::mpsc::channel::<()>();
    let handle = ScanLoop::start(
        Box::new(StalledSource {
            gate: Arc::new(std::sync::Mutex::new(gate)),
            probe: probe.clone(),
        }),
        Arc::new(MarkerDetector),
        |_| {},
    );

    let served = probe.served.clone();
    wait_until(move || served.load(Ordering::SeqCst) == 1).await;

    let stats = tokio::time::timeout(Duration::from_secs(1), handle.join())
        .await
        .expect("join returned while the capture was still blocked");
    assert_eq!(stats.frames, 0);
    assert!(probe.stopped.load(Ordering::SeqCst));

    // Let the pool thread finish so the runtime can shut down.
    drop(release);
}
