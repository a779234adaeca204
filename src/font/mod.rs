//! Font loading and glyph rasterization
//!
//! Handles:
//! - Font family resolution (fontconfig)
//! - Single glyph rasterization to a coverage bitmap (fontdue)

pub mod bitmap;
pub mod fontconfig;
pub mod rasterizer;

pub use bitmap::CoverageBitmap;
pub use fontconfig::{resolve_font, FontFinder};
pub use rasterizer::{rasterize_glyph, FontdueRasterizer, GlyphExtents, GlyphRasterizer};

use thiserror::Error;

/// Rasterization failures
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("no text to rasterize")]
    EmptyText,
    #[error("font face \"{0}\" is not loaded")]
    UnknownFace(String),
    #[error("font \"{family}\" could not be parsed: {reason}")]
    InvalidFont { family: String, reason: String },
    #[error("glyph for {0:?} not present in font")]
    MissingGlyph(char),
    #[error("coverage data is {actual} bytes, expected {expected} for {width}x{height}")]
    BitmapSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}
