//! Signed distance field generation
//!
//! Downsamples a high-resolution coverage bitmap into a compact distance
//! field that the fragment shader can reconstruct at any zoom.
//!
//! # Encoding
//!
//! ```text
//!   0 ........ 127 | 128 ........ 255
//!   far inside     edge      far outside
//! ```
//!
//! Distances are measured in source-bitmap pixels and clamped at
//! `R = filter_width * sampling`.
//!
//! # Cost
//!
//! The search is brute force: every output texel scans a `(2R+1)²` window of
//! source pixels. That is fine for one glyph at startup and does not scale to
//! atlases or runtime regeneration. A two-pass chamfer or
//! Felzenszwalb-Huttenlocher transform can replace [`nearest_opposite`]
//! as long as classification, clamp radius and quantization stay the same.

use log::info;
use std::time::Instant;
use thiserror::Error;

use crate::font::rasterizer::align4;
use crate::font::CoverageBitmap;

/// Coverage at or above this value counts as inside the glyph
pub const INSIDE_THRESHOLD: u8 = 128;

/// Encoded value of the zero-crossing
pub const EDGE_VALUE: u8 = 128;

/// Distance assumed when no opposite pixel lies within the search window
const FAR_SENTINEL: f64 = 1e10;

/// Parameter errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SdfError {
    #[error("sampling factor must be at least 1")]
    ZeroSampling,
    #[error("filter width must be at least 1")]
    ZeroFilterWidth,
    #[error("search radius {filter_width} x {sampling} exceeds {max} source pixels")]
    RadiusTooLarge {
        sampling: u32,
        filter_width: u32,
        max: u32,
    },
}

/// Distance field parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdfParams {
    /// Source pixels per output texel
    pub sampling: u32,
    /// Output texels of exact distance around the edge
    pub filter_width: u32,
}

impl Default for SdfParams {
    fn default() -> Self {
        Self {
            sampling: 8,
            filter_width: 8,
        }
    }
}

impl SdfParams {
    /// Largest accepted `filter_width * sampling`
    pub const MAX_RADIUS: u32 = 1024;

    pub fn new(sampling: u32, filter_width: u32) -> Result<Self, SdfError> {
        if sampling == 0 {
            return Err(SdfError::ZeroSampling);
        }
        if filter_width == 0 {
            return Err(SdfError::ZeroFilterWidth);
        }
        match filter_width.checked_mul(sampling) {
            Some(r) if r <= Self::MAX_RADIUS => {}
            _ => {
                return Err(SdfError::RadiusTooLarge {
                    sampling,
                    filter_width,
                    max: Self::MAX_RADIUS,
                })
            }
        }
        Ok(Self {
            sampling,
            filter_width,
        })
    }

    /// Clamp radius in source pixels
    pub fn radius(&self) -> u32 {
        self.filter_width.saturating_mul(self.sampling)
    }

    /// Output texture size for a `swidth × sheight` source
    pub fn output_size(&self, swidth: u32, sheight: u32) -> (u32, u32) {
        let pad = self.filter_width.saturating_mul(2);
        let width = swidth.div_ceil(self.sampling).saturating_add(pad);
        let height = sheight.div_ceil(self.sampling).saturating_add(pad);
        (align4(width), height)
    }

    /// Source-space position of output texel (x, y)
    #[inline]
    pub fn source_position(&self, x: u32, y: u32) -> (i64, i64) {
        let fw = self.filter_width as i64;
        let s = self.sampling as i64;
        ((x as i64 - fw) * s, (y as i64 - fw) * s)
    }
}

/// Single-channel distance field texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceField {
    width: u32,
    height: u32,
    params: SdfParams,
    data: Vec<u8>,
}

impl DistanceField {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn params(&self) -> SdfParams {
        self.params
    }

    /// Row-major texel data, `width * height` bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// Quantize a distance to the 8-bit encoding
///
/// Inside: `128 - min(d, R) * 128 / R`. Outside: `127 + min(d, R) * 128 / R`.
/// The fractional part is truncated.
#[inline]
pub fn encode_distance(inside: bool, distance: f64, radius: u32) -> u8 {
    let r = radius as f64;
    let scaled = distance.min(r) * 128.0 / r;
    if inside {
        (128.0 - scaled) as u8
    } else {
        (127.0 + scaled) as u8
    }
}

/// Minimum Euclidean distance from (sx, sy) to a source pixel whose
/// classification differs from `inside`, searching `[-radius, radius]²`
///
/// Returns the sentinel when the window holds no opposite pixel.
pub fn nearest_opposite(
    bitmap: &CoverageBitmap,
    sx: i64,
    sy: i64,
    inside: bool,
    radius: u32,
) -> f64 {
    let r = radius as i64;
    let mut best: Option<i64> = None;

    for i in -r..=r {
        for j in -r..=r {
            let opposite = (bitmap.sample(sx + i, sy + j) >= INSIDE_THRESHOLD) != inside;
            if !opposite {
                continue;
            }
            let d2 = i * i + j * j;
            if best.map_or(true, |b| d2 < b) {
                best = Some(d2);
            }
        }
    }

    // sqrt is monotonic, so one sqrt of the squared minimum is exact
    best.map_or(FAR_SENTINEL, |d2| (d2 as f64).sqrt())
}

/// Build the distance field for `bitmap`
///
/// Pure function of its inputs: the same bitmap and params always give
/// bit-identical output.
pub fn build(bitmap: &CoverageBitmap, params: SdfParams) -> DistanceField {
    let started = Instant::now();
    let (width, height) = params.output_size(bitmap.width(), bitmap.height());
    let radius = params.radius();
    let mut data = vec![0u8; width as usize * height as usize];

    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = params.source_position(x, y);
            let inside = bitmap.sample(sx, sy) >= INSIDE_THRESHOLD;
            let distance = nearest_opposite(bitmap, sx, sy, inside, radius);
            data[y as usize * width as usize + x as usize] =
                encode_distance(inside, distance, radius);
        }
    }

    info!(
        "Distance field built: {}x{} -> {}x{} (sampling={}, filter={}) in {:.1}ms",
        bitmap.width(),
        bitmap.height(),
        width,
        height,
        params.sampling,
        params.filter_width,
        started.elapsed().as_secs_f64() * 1000.0
    );

    DistanceField {
        width,
        height,
        params,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(sampling: u32, filter_width: u32) -> SdfParams {
        SdfParams::new(sampling, filter_width).unwrap()
    }

    /// Left half outside, right half (x >= edge) fully covered
    fn step_bitmap(width: u32, height: u32, edge: u32) -> CoverageBitmap {
        let mut bmp = CoverageBitmap::blank(width, height);
        bmp.fill_rect(edge as i64, 0, width - edge, height, 255);
        bmp
    }

    #[test]
    fn test_params_validation() {
        assert_eq!(SdfParams::new(0, 8), Err(SdfError::ZeroSampling));
        assert_eq!(SdfParams::new(8, 0), Err(SdfError::ZeroFilterWidth));
        assert_eq!(SdfParams::default().radius(), 64);
    }

    #[test]
    fn test_params_reject_oversized_radius() {
        let too_large = SdfError::RadiusTooLarge {
            sampling: 70000,
            filter_width: 70000,
            max: SdfParams::MAX_RADIUS,
        };
        // Product overflows u32
        assert_eq!(SdfParams::new(70000, 70000), Err(too_large));
        assert!(matches!(
            SdfParams::new(64, 17),
            Err(SdfError::RadiusTooLarge { .. })
        ));
        assert_eq!(SdfParams::new(32, 32).map(|p| p.radius()), Ok(1024));
    }

    #[test]
    fn test_output_size() {
        let p = params(8, 8);
        // ceil(100/8)=13 + 16 = 29 -> 32; ceil(50/8)=7 + 16 = 23
        assert_eq!(p.output_size(100, 50), (32, 23));
        // Degenerate glyph still gets the padding
        assert_eq!(p.output_size(0, 0), (16, 16));
        let p = params(4, 3);
        assert_eq!(p.output_size(0, 0), (8, 6));
    }

    #[test]
    fn test_encode_distance_bounds() {
        let r = 64;
        assert_eq!(encode_distance(true, 0.0, r), 128);
        assert_eq!(encode_distance(true, 1.0, r), 126);
        assert_eq!(encode_distance(true, 64.0, r), 0);
        assert_eq!(encode_distance(true, FAR_SENTINEL, r), 0);
        assert_eq!(encode_distance(false, 1.0, r), 129);
        assert_eq!(encode_distance(false, 64.0, r), 255);
        assert_eq!(encode_distance(false, FAR_SENTINEL, r), 255);
    }

    #[test]
    fn test_encode_distance_monotone() {
        let r = 16;
        let mut prev_in = 255u8;
        let mut prev_out = 0u8;
        for step in 0..=200 {
            let d = step as f64 * 0.1;
            let vin = encode_distance(true, d, r);
            let vout = encode_distance(false, d, r);
            assert!(vin <= prev_in);
            assert!(vout >= prev_out);
            prev_in = vin;
            prev_out = vout;
        }
    }

    #[test]
    fn test_blank_bitmap_saturates() {
        let bmp = CoverageBitmap::blank(40, 24);
        let field = build(&bmp, params(4, 4));
        assert_eq!(field.width() % 4, 0);
        assert!(field.data().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_empty_bitmap_has_padding() {
        let bmp = CoverageBitmap::blank(0, 0);
        let field = build(&bmp, params(8, 8));
        assert!(field.width() >= 16 && field.height() >= 16);
        assert_eq!(field.width() % 4, 0);
        assert!(field.data().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_solid_square() {
        let size = 96;
        let mut bmp = CoverageBitmap::blank(size, size);
        bmp.fill_rect(0, 0, size, size, 255);
        let p = params(4, 4);
        let field = build(&bmp, p);
        let r = p.radius() as i64;

        for y in 0..field.height() {
            for x in 0..field.width() {
                let (sx, sy) = p.source_position(x, y);
                let v = field.get(x, y);
                let inside = sx >= 0 && sy >= 0 && sx < size as i64 && sy < size as i64;
                if !inside {
                    assert!(v >= EDGE_VALUE, "outside texel ({}, {}) = {}", x, y, v);
                    continue;
                }
                assert!(v < EDGE_VALUE, "inside texel ({}, {}) = {}", x, y, v);
                // Distance to the nearest outside pixel (just past the border)
                let d = (sx + 1).min(sy + 1).min(size as i64 - sx).min(size as i64 - sy);
                if d >= r {
                    assert_eq!(v, 0);
                } else {
                    assert_eq!(v, encode_distance(true, d as f64, p.radius()));
                }
            }
        }
    }

    #[test]
    fn test_inside_values_fall_with_depth() {
        let bmp = step_bitmap(256, 64, 64);
        let p = params(4, 4);
        let field = build(&bmp, p);
        let y = field.height() / 2;
        let mut prev: Option<u8> = None;
        for x in 0..field.width() {
            let (sx, _) = p.source_position(x, y);
            if sx < 64 || sx >= 256 - p.radius() as i64 {
                continue;
            }
            let v = field.get(x, y);
            assert!(v < EDGE_VALUE);
            if let Some(last) = prev {
                assert!(v <= last);
            }
            prev = Some(v);
        }
    }

    #[test]
    fn test_step_edge_single_crossing() {
        let p = params(8, 8);
        let bmp = step_bitmap(64, 16, 29);
        let field = build(&bmp, p);

        for y in 0..field.height() {
            let row: Vec<u8> = (0..field.width()).map(|x| field.get(x, y)).collect();
            let (sx0, sy) = p.source_position(0, y);
            if sy < 0 || sy >= 16 {
                // Rows outside the source never cross
                assert!(row.iter().all(|&v| v >= EDGE_VALUE));
                continue;
            }
            let crossings: Vec<usize> = row
                .windows(2)
                .enumerate()
                .filter(|(_, w)| (w[0] >= EDGE_VALUE) != (w[1] >= EDGE_VALUE))
                .map(|(i, _)| i)
                .collect();
            // Outside -> inside at the edge, inside -> outside past the right border
            assert_eq!(crossings.len(), 2, "row {}: {:?} (sx0={})", y, row, sx0);
            let i = crossings[0];
            assert!(row[i] >= EDGE_VALUE && row[i + 1] < EDGE_VALUE);
            // Texels straddling the edge sit within one output texel of 128
            let tolerance = (p.sampling * 128 / p.radius()) as i32 + 1;
            assert!((row[i] as i32 - 128).abs() <= tolerance, "{}", row[i]);
            assert!((row[i + 1] as i32 - 128).abs() <= tolerance, "{}", row[i + 1]);
        }
    }

    #[test]
    fn test_boundary_texel_near_edge_value() {
        // Edge exactly on a sample position: x=24 is the first inside sample
        let p = params(8, 8);
        let bmp = step_bitmap(64, 16, 24);
        let field = build(&bmp, p);
        let y = 9; // sy = 8
        let inside = field.get(11, y); // sx = 24, one pixel from outside
        let outside = field.get(10, y); // sx = 16, eight pixels from inside
        assert_eq!(inside, 126);
        assert_eq!(outside, encode_distance(false, 8.0, 64));
        assert!((outside as i32 - 128).abs() <= 17);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut bmp = CoverageBitmap::blank(48, 40);
        bmp.fill_rect(10, 5, 20, 12, 255);
        bmp.fill_rect(30, 20, 7, 15, 180);
        bmp.put(3, 3, 127);
        let p = params(4, 2);
        let a = build(&bmp, p);
        let b = build(&bmp, p);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearest_opposite_sentinel() {
        let bmp = CoverageBitmap::blank(8, 8);
        assert_eq!(nearest_opposite(&bmp, 4, 4, false, 3), FAR_SENTINEL);
        let mut bmp = CoverageBitmap::blank(8, 8);
        bmp.put(7, 7, 255);
        let d = nearest_opposite(&bmp, 4, 4, false, 3);
        assert!((d - 18f64.sqrt()).abs() < 1e-12);
    }
}
