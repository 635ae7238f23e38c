//! Generate a styled QR code and save it to a file
//!
//! Usage: cargo run --example generate_qr

use qrstudio::render::PngSurface;
use qrstudio::{DotShape, QrStudio, StudioConfig, StyleConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut config = StudioConfig::default();
    config.render.download_dir = ".".into();

    let mut studio = QrStudio::from_config(&config, Box::new(PngSurface::new("qr_preview.png")));

    // Plain text payload with the default style
    studio.set_text("Hello from qrstudio!");
    studio.render()?;
    println!("✓ Preview written to qr_preview.png");
    println!("  Payload: {}", studio.payload());

    // Restyle and export
    studio.set_style(
        StyleConfig::default()
            .with_dot_color("#1d4ed8")
            .with_background_color("#f8fafc")
            .with_dot_shape(DotShape::ClassyRounded),
    );
    studio.render()?;

    let outcome = studio.download().await?;
    println!("✓ Styled QR code saved: {:?}", outcome);

    Ok(())
}
