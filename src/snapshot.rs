//! Debug snapshot of the coverage bitmap

use anyhow::{bail, Context, Result};
use log::info;
use std::path::Path;

use crate::font::CoverageBitmap;

/// Save the bitmap as an 8-bit grayscale PNG
pub fn write_png(bitmap: &CoverageBitmap, path: &Path) -> Result<()> {
    if bitmap.width() == 0 || bitmap.height() == 0 {
        bail!(
            "Cannot write empty {}x{} bitmap",
            bitmap.width(),
            bitmap.height()
        );
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut encoder = png::Encoder::new(
        std::io::BufWriter::new(file),
        bitmap.width(),
        bitmap.height(),
    );
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(bitmap.data())?;

    info!(
        "Coverage snapshot saved: {} ({}x{})",
        path.display(),
        bitmap.width(),
        bitmap.height()
    );
    Ok(())
}
