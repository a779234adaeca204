//! End-to-end glyph preparation with a synthetic rasterizer
//!
//! Runs without fonts or a GPU.

use sdfglyph::config::{DebugConfig, GlyphConfig};
use sdfglyph::font::{CoverageBitmap, GlyphExtents, GlyphRasterizer, RasterError};
use sdfglyph::frame::{rotation_matrix, FrameDriver, FrameTarget};
use sdfglyph::gpu::shader::reconstruct_alpha;
use sdfglyph::pipeline::prepare_glyph;
use sdfglyph::sdf::EDGE_VALUE;

/// Draws a filled disc of radius 30 in a 64x64 box
struct DiscRasterizer;

impl GlyphRasterizer for DiscRasterizer {
    fn measure(&self, _: &str, _: f32, text: &str) -> Result<GlyphExtents, RasterError> {
        if text.is_empty() {
            return Err(RasterError::EmptyText);
        }
        Ok(GlyphExtents {
            x_bearing: 0.0,
            y_bearing: -64.0,
            width: 64.0,
            height: 64.0,
        })
    }

    fn render(
        &self,
        _: &str,
        _: f32,
        _: &str,
        width: u32,
        height: u32,
    ) -> Result<CoverageBitmap, RasterError> {
        let mut bmp = CoverageBitmap::blank(width, height);
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let (dx, dy) = (x - 32, y - 32);
                if dx * dx + dy * dy <= 30 * 30 {
                    bmp.put(x, y, 255);
                }
            }
        }
        Ok(bmp)
    }
}

fn glyph_config() -> GlyphConfig {
    GlyphConfig {
        family: "test".to_string(),
        text: "o".to_string(),
        tex_size: 16,
        sampling: 4,
        filter_width: 4,
    }
}

fn no_snapshot() -> DebugConfig {
    DebugConfig {
        write_snapshot: false,
        snapshot_path: String::new(),
    }
}

#[test]
fn disc_field_layout() {
    let glyph = prepare_glyph(&DiscRasterizer, &glyph_config(), &no_snapshot()).unwrap();
    assert_eq!((glyph.coverage.width(), glyph.coverage.height()), (64, 64));

    // ceil(64/4) + 2*4 = 24, already a multiple of 4
    let field = &glyph.field;
    assert_eq!((field.width(), field.height()), (24, 24));

    // Texel 12 samples source pixel 32 (the disc center), 30px from the
    // edge with a 16px clamp radius
    assert_eq!(field.get(12, 12), 0);
    // Corner is far outside
    assert_eq!(field.get(0, 0), 255);
}

#[test]
fn disc_field_rises_from_center_outward() {
    let glyph = prepare_glyph(&DiscRasterizer, &glyph_config(), &no_snapshot()).unwrap();
    let field = &glyph.field;

    let row: Vec<u8> = (12..field.width()).map(|x| field.get(x, 12)).collect();
    for pair in row.windows(2) {
        assert!(pair[0] <= pair[1], "row not monotonic: {:?}", row);
    }
    // Exactly one step crosses the edge value
    let crossings = row
        .windows(2)
        .filter(|p| (p[0] < EDGE_VALUE) != (p[1] < EDGE_VALUE))
        .count();
    assert_eq!(crossings, 1, "{:?}", row);
}

#[test]
fn reconstruction_is_black_inside_white_outside() {
    let glyph = prepare_glyph(&DiscRasterizer, &glyph_config(), &no_snapshot()).unwrap();
    let field = &glyph.field;
    let radius = field.params().radius();
    let m = 0.01;

    let center = field.get(12, 12) as f32 / 255.0;
    let corner = field.get(0, 0) as f32 / 255.0;
    assert_eq!(reconstruct_alpha(center, m, radius), 0.0);
    assert_eq!(reconstruct_alpha(corner, m, radius), 1.0);
}

#[test]
fn snapshot_written_next_to_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("glyph.png");
    let debug = DebugConfig {
        write_snapshot: true,
        snapshot_path: path.to_string_lossy().into_owned(),
    };

    prepare_glyph(&DiscRasterizer, &glyph_config(), &debug).unwrap();

    let decoder = png::Decoder::new(std::fs::File::open(&path).unwrap());
    let reader = decoder.read_info().unwrap();
    assert_eq!(reader.info().width, 64);
    assert_eq!(reader.info().height, 64);
}

#[test]
fn snapshot_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let debug = DebugConfig {
        write_snapshot: true,
        snapshot_path: dir
            .path()
            .join("missing")
            .join("glyph.png")
            .to_string_lossy()
            .into_owned(),
    };
    assert!(prepare_glyph(&DiscRasterizer, &glyph_config(), &debug).is_ok());
}

#[test]
fn empty_text_is_rejected() {
    let mut cfg = glyph_config();
    cfg.text.clear();
    assert!(prepare_glyph(&DiscRasterizer, &cfg, &no_snapshot()).is_err());
}

#[test]
fn invalid_params_are_rejected() {
    let mut cfg = glyph_config();
    cfg.sampling = 0;
    assert!(prepare_glyph(&DiscRasterizer, &cfg, &no_snapshot()).is_err());
}

/// Counts frames and keeps the last matrix
#[derive(Default)]
struct CountingTarget {
    drawn: usize,
    presented: usize,
    last: Option<[f32; 16]>,
}

impl FrameTarget for CountingTarget {
    fn draw(&mut self, matrix: &[f32; 16]) -> anyhow::Result<()> {
        self.drawn += 1;
        self.last = Some(*matrix);
        Ok(())
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.presented += 1;
        Ok(())
    }
}

#[test]
fn driver_completes_half_turn() {
    let mut driver = FrameDriver::new(3.0);
    let mut target = CountingTarget::default();
    // Tick 1081 draws frame 1080: π/360 * 1080 / 3 = π
    for _ in 0..=1080 {
        driver.tick(&mut target).unwrap();
    }
    assert_eq!(target.drawn, 1081);
    assert_eq!(target.presented, 1081);

    let last = target.last.unwrap();
    let expected = rotation_matrix(std::f32::consts::PI);
    for (a, b) in last.iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-4);
    }
}
