//! Cancellable per-frame detection loop

use crate::scanner::{BarcodeDetector, FrameSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Counters collected by a finished scan loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Frames pulled from the source, including failed captures
    pub frames: u64,
    /// Frames that produced a decoded value
    pub decoded: u64,
    /// Capture and detection failures
    pub errors: u64,
}

/// Delay after the first of a run of failed captures
const CAPTURE_BACKOFF_START: Duration = Duration::from_millis(20);
/// Longest delay between capture attempts while the source keeps failing
const CAPTURE_BACKOFF_MAX: Duration = Duration::from_millis(500);
/// A failing source is reported at warn level once per this many failures
const CAPTURE_WARN_EVERY: u32 = 50;

/// Delay before retrying after `failures` consecutive capture errors
fn capture_backoff(failures: u32) -> Duration {
    let doublings = failures.saturating_sub(1).min(16);
    CAPTURE_BACKOFF_START
        .saturating_mul(1 << doublings)
        .min(CAPTURE_BACKOFF_MAX)
}

/// Repeating detection task over a frame source
pub struct ScanLoop;

impl ScanLoop {
    /// Spawn the loop on the current tokio runtime.
    ///
    /// Every frame is handed to `detector`; when it yields at least one
    /// barcode the first raw value is passed to `on_decode` and scanning
    /// carries on. The source is stopped when the loop ends.
    pub fn start<F>(
        source: Box<dyn FrameSource>,
        detector: Arc<dyn BarcodeDetector>,
        on_decode: F,
    ) -> CancelHandle
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(run(source, detector, on_decode, cancelled));
        CancelHandle {
            cancel,
            task: Some(task),
        }
    }
}

async fn run<F>(
    mut source: Box<dyn FrameSource>,
    detector: Arc<dyn BarcodeDetector>,
    on_decode: F,
    mut cancelled: watch::Receiver<bool>,
) -> ScanStats
where
    F: Fn(String) + Send + Sync + 'static,
{
    let mut stats = ScanStats::default();
    let mut failures: u32 = 0;
    tracing::debug!("Scan loop started");

    loop {
        if *cancelled.borrow() {
            break;
        }

        let frame = tokio::select! {
            biased;
            // A dropped handle also ends the loop.
            _ = cancelled.changed() => break,
            frame = source.next_frame() => frame,
        };
        stats.frames += 1;

        let frame = match frame {
            Ok(frame) => {
                if failures > 0 {
                    tracing::info!(failures, "Frame capture recovered");
                    failures = 0;
                }
                frame
            }
            Err(err) => {
                stats.errors += 1;
                failures = failures.saturating_add(1);
                if failures % CAPTURE_WARN_EVERY == 1 {
                    tracing::warn!(failures, "Frame capture failed: {err}");
                } else {
                    tracing::debug!(failures, "Frame capture failed: {err}");
                }

                tokio::select! {
                    biased;
                    _ = cancelled.changed() => break,
                    _ = tokio::time::sleep(capture_backoff(failures)) => {}
                }
                continue;
            }
        };

        let detector = Arc::clone(&detector);
        match tokio::task::spawn_blocking(move || detector.detect(&frame)).await {
            Ok(Ok(found)) => {
                if let Some(first) = found.into_iter().next() {
                    stats.decoded += 1;
                    tracing::debug!(length = first.raw_value.len(), "Barcode decoded");
                    on_decode(first.raw_value);
                }
            }
            Ok(Err(err)) => {
                stats.errors += 1;
                tracing::error!("Barcode detection error: {err}");
            }
            Err(err) => {
                stats.errors += 1;
                tracing::error!("Barcode detection task failed: {err}");
            }
        }
    }

    source.stop();
    tracing::debug!(
        frames = stats.frames,
        decoded = stats.decoded,
        errors = stats.errors,
        "Scan loop stopped"
    );
    stats
}

/// Handle to a running [`ScanLoop`].
///
/// Dropping the handle cancels the loop.
pub struct CancelHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<ScanStats>>,
}

impl CancelHandle {
    /// Ask the loop to stop after the frame in flight. Safe to call repeatedly.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Whether the loop task has exited
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Cancel the loop and wait until the frame source has been stopped
    pub async fn join(mut self) -> ScanStats {
        self.cancel();
        match self.task.take() {
            Some(task) => task.await.unwrap_or_else(|err| {
                tracing::error!("Scan loop task failed: {err}");
                ScanStats::default()
            }),
            None => ScanStats::default(),
        }
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_backoff_doubles_up_to_cap() {
        assert_eq!(capture_backoff(1), Duration::from_millis(20));
        assert_eq!(capture_backoff(2), Duration::from_millis(40));
        assert_eq!(capture_backoff(4), Duration::from_millis(160));
        assert_eq!(capture_backoff(6), CAPTURE_BACKOFF_MAX);
        assert_eq!(capture_backoff(u32::MAX), CAPTURE_BACKOFF_MAX);
    }
}
