//! Glyph preparation
//!
//! Rasterize the configured character and convert it to a distance field.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

use crate::config::{DebugConfig, GlyphConfig};
use crate::font::{rasterize_glyph, CoverageBitmap, GlyphRasterizer};
use crate::sdf::{self, DistanceField};
use crate::snapshot;

/// Coverage bitmap and the field built from it
pub struct PreparedGlyph {
    pub coverage: CoverageBitmap,
    pub field: DistanceField,
}

/// Rasterize, optionally snapshot, then build the field
///
/// A failed snapshot is logged and otherwise ignored.
pub fn prepare_glyph<R: GlyphRasterizer + ?Sized>(
    rasterizer: &R,
    glyph: &GlyphConfig,
    debug: &DebugConfig,
) -> Result<PreparedGlyph> {
    let params = glyph.sdf_params()?;
    let size = glyph.font_size();

    let coverage = rasterize_glyph(rasterizer, &glyph.family, size, &glyph.text)
        .with_context(|| format!("Failed to rasterize {:?} at {}px", glyph.text, size))?;
    info!(
        "Rasterized {:?}: {}x{} coverage",
        glyph.text,
        coverage.width(),
        coverage.height()
    );

    if debug.write_snapshot {
        if let Err(e) = snapshot::write_png(&coverage, Path::new(&debug.snapshot_path)) {
            warn!("Snapshot not written: {:#}", e);
        }
    }

    let field = sdf::build(&coverage, params);
    Ok(PreparedGlyph { coverage, field })
}
