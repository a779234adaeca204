//! Glyph rasterizer
//!
//! Renders a single character to a high-resolution coverage bitmap.
//! Bitmap dimensions are only known once text metrics exist at the target
//! size, so rasterization is a two-pass measure/render protocol.

use fontdue::{Font, FontSettings};
use log::{debug, info};
use std::collections::HashMap;

use super::bitmap::CoverageBitmap;
use super::RasterError;

/// Ink extents of a glyph at a given size (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphExtents {
    /// Left edge of the ink relative to the pen origin
    pub x_bearing: f32,
    /// Top edge of the ink relative to the baseline (negative = above)
    pub y_bearing: f32,
    /// Ink width
    pub width: f32,
    /// Ink height
    pub height: f32,
}

impl GlyphExtents {
    /// Bitmap size that tightly holds the ink on the pixel grid
    ///
    /// Width is rounded up to a multiple of 4 so rows stay 4-byte aligned.
    pub fn bitmap_size(&self) -> (u32, u32) {
        let w = (self.x_bearing + self.width).ceil() - self.x_bearing.floor();
        let h = (self.y_bearing + self.height).ceil() - self.y_bearing.floor();
        let w = w.max(0.0) as u32;
        let h = h.max(0.0) as u32;
        (align4(w), h)
    }

    /// Pen position that puts the ink's top-left corner at pixel (0, 0)
    pub fn origin(&self) -> (i64, i64) {
        (
            -(self.x_bearing.floor() as i64),
            -(self.y_bearing.floor() as i64),
        )
    }
}

/// Round up to the next multiple of 4
#[inline]
pub fn align4(v: u32) -> u32 {
    v.saturating_add(3) & !3
}

/// Host 2D glyph rasterization backend
pub trait GlyphRasterizer {
    /// Measure the ink extents of `text` rendered with `face` at `size` px
    fn measure(&self, face: &str, size: f32, text: &str) -> Result<GlyphExtents, RasterError>;

    /// Render `text` into a `width × height` coverage bitmap
    ///
    /// The glyph is positioned at the origin derived from the same extents
    /// `measure` returns.
    fn render(
        &self,
        face: &str,
        size: f32,
        text: &str,
        width: u32,
        height: u32,
    ) -> Result<CoverageBitmap, RasterError>;
}

/// Measure, then render into a bitmap of exactly the measured size
pub fn rasterize_glyph<R: GlyphRasterizer + ?Sized>(
    rasterizer: &R,
    face: &str,
    size: f32,
    text: &str,
) -> Result<CoverageBitmap, RasterError> {
    let extents = rasterizer.measure(face, size, text)?;
    let (width, height) = extents.bitmap_size();
    debug!(
        "Glyph extents: bearing=({:.1}, {:.1}) size={:.1}x{:.1} -> bitmap {}x{}",
        extents.x_bearing, extents.y_bearing, extents.width, extents.height, width, height
    );
    rasterizer.render(face, size, text, width, height)
}

/// First character of the text (only single-glyph rendering is supported)
fn first_char(text: &str) -> Result<char, RasterError> {
    text.chars().next().ok_or(RasterError::EmptyText)
}

/// fontdue-backed rasterizer
///
/// Faces are registered up front by family name; lookups never touch the
/// filesystem.
#[derive(Default)]
pub struct FontdueRasterizer {
    faces: HashMap<String, Font>,
}

impl FontdueRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register font data under a family name
    pub fn add_face(&mut self, family: &str, data: &[u8]) -> Result<(), RasterError> {
        let font = Font::from_bytes(data, FontSettings::default()).map_err(|e| {
            RasterError::InvalidFont {
                family: family.to_string(),
                reason: e.to_string(),
            }
        })?;
        info!("Font face registered: \"{}\" ({} glyphs)", family, font.glyph_count());
        self.faces.insert(family.to_string(), font);
        Ok(())
    }

    fn face(&self, family: &str) -> Result<&Font, RasterError> {
        self.faces
            .get(family)
            .ok_or_else(|| RasterError::UnknownFace(family.to_string()))
    }

    fn glyph_char(font: &Font, text: &str) -> Result<char, RasterError> {
        let ch = first_char(text)?;
        if font.lookup_glyph_index(ch) == 0 && !ch.is_whitespace() {
            return Err(RasterError::MissingGlyph(ch));
        }
        Ok(ch)
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn measure(&self, face: &str, size: f32, text: &str) -> Result<GlyphExtents, RasterError> {
        let font = self.face(face)?;
        let ch = Self::glyph_char(font, text)?;
        let bounds = font.metrics(ch, size).bounds;

        // fontdue bounds are y-up from the baseline
        Ok(GlyphExtents {
            x_bearing: bounds.xmin,
            y_bearing: -(bounds.ymin + bounds.height),
            width: bounds.width,
            height: bounds.height,
        })
    }

    fn render(
        &self,
        face: &str,
        size: f32,
        text: &str,
        width: u32,
        height: u32,
    ) -> Result<CoverageBitmap, RasterError> {
        let extents = self.measure(face, size, text)?;
        let font = self.face(face)?;
        let ch = Self::glyph_char(font, text)?;
        let (metrics, coverage) = font.rasterize(ch, size);

        let (ox, oy) = extents.origin();
        // Bitmap top row sits at baseline-relative y = ymin + height (y-up)
        let left = metrics.xmin as i64 + ox;
        let top = -(metrics.ymin as i64 + metrics.height as i64) + oy;

        let mut bitmap = CoverageBitmap::blank(width, height);
        bitmap.blit(&coverage, metrics.width, metrics.height, left, top);

        debug!(
            "Rendered '{}' at {}px: {}x{} coverage into {}x{} bitmap",
            ch, size, metrics.width, metrics.height, width, height
        );
        Ok(bitmap)
    }
}
