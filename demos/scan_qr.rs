//! Scan QR codes from a webcam
//!
//! Usage: cargo run --example scan_qr

use std::sync::Arc;

use qrstudio::scanner::platform_detector;
use qrstudio::{CameraConfig, ScannerAdapter, V4lCameraProvider};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("qrstudio camera scanner");
    println!("=======================\n");

    println!("Available cameras:");
    match qrstudio::camera::list_devices() {
        Ok(devices) => {
            for dev in &devices {
                println!("  [{}] {} ({})", dev.index, dev.name, dev.path);
            }
        }
        Err(e) => {
            eprintln!("Error listing cameras: {}", e);
            return Ok(());
        }
    }

    let provider = Arc::new(V4lCameraProvider::new(CameraConfig::default()));
    let mut scanner = ScannerAdapter::new(platform_detector(), provider);

    let (tx, mut rx) = mpsc::unbounded_channel();
    scanner
        .start(move |value| {
            let _ = tx.send(value);
        })
        .await?;

    println!("\nScanning for QR codes (Ctrl+C to stop)...\n");

    loop {
        tokio::select! {
            Some(value) = rx.recv() => println!("✓ QR Code detected: {}", value),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Some(stats) = scanner.stop().await {
        println!(
            "\nScanned {} frames, {} decoded, {} errors",
            stats.frames, stats.decoded, stats.errors
        );
    }

    Ok(())
}
