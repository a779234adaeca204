//! Coverage bitmap
//!
//! 8-bit alpha grid produced by the rasterizer and consumed once by the
//! distance field builder.

use super::RasterError;

/// Row-major 8-bit coverage grid (0 = empty, 255 = fully covered)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CoverageBitmap {
    /// Wrap existing coverage data
    ///
    /// `data.len()` must equal `width * height`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RasterError::BitmapSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// All-zero bitmap
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Coverage at (x, y); anything outside the grid reads as 0
    #[inline]
    pub fn sample(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Write coverage at (x, y), ignoring out-of-range coordinates
    #[inline]
    pub fn put(&mut self, x: i64, y: i64, value: u8) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = value;
    }

    /// Fill an axis-aligned rectangle (clipped to the grid)
    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, value: u8) {
        for yy in y..y + h as i64 {
            for xx in x..x + w as i64 {
                self.put(xx, yy, value);
            }
        }
    }

    /// Copy `src` (a `src_w × src_h` alpha grid) with its top-left at (x, y)
    ///
    /// Coverage is combined with max so overlapping blits never darken.
    pub fn blit(&mut self, src: &[u8], src_w: usize, src_h: usize, x: i64, y: i64) {
        for row in 0..src_h {
            for col in 0..src_w {
                let Some(&v) = src.get(row * src_w + col) else {
                    return;
                };
                let dx = x + col as i64;
                let dy = y + row as i64;
                let current = self.sample(dx, dy);
                self.put(dx, dy, current.max(v));
            }
        }
    }
}
