//! sdfglyph - signed distance field glyph demo for the Linux console
//!
//! Startup:
//! 1. Rasterize the glyph and build its distance field (CPU)
//! 2. DRM/KMS output, GBM surface, EGL context
//! 3. Upload the field, compile the shader, draw the rotating quad

use anyhow::{Context, Result};
use log::{error, info, warn};

use sdfglyph::config::Config;
use sdfglyph::drm::{self as kms, Output, SavedCrtc, Scanout};
use sdfglyph::font::{resolve_font, FontdueRasterizer};
use sdfglyph::frame::{FrameDriver, FrameTarget, Ticker};
use sdfglyph::gpu::{
    ContextManager, EglDisplay, GbmDevice, GbmSurface, GlRenderer, GlyphRenderer, SurfaceId,
};
use sdfglyph::pipeline::{prepare_glyph, PreparedGlyph};

fn print_help() {
    println!(
        r#"sdfglyph {} - signed distance field glyph renderer for Linux console

USAGE:
    sdfglyph [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    -t, --test              Build the distance field and snapshot only (no DRM)

EXAMPLES:
    sdfglyph                          Run (requires TTY, not X11/Wayland)
    RUST_LOG=info sdfglyph            Run with startup diagnostics
    kill -USR1 $(pidof sdfglyph)      Redraw the current frame

CONFIG FILE:
    ~/.config/sdfglyph/config.toml
    (override with SDFGLYPH_CONFIG, font with SDFGLYPH_FONT)
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Draws into the output's GBM surface and scans it out
struct ScanoutTarget<'a> {
    device: &'a kms::Device,
    output: &'a Output,
    contexts: &'a ContextManager,
    surface: SurfaceId,
    renderer: &'a GlRenderer,
    glyph: &'a GlyphRenderer,
    clear: (f32, f32, f32),
    scanout: Scanout,
}

impl FrameTarget for ScanoutTarget<'_> {
    fn draw(&mut self, matrix: &[f32; 16]) -> Result<()> {
        let (r, g, b) = self.clear;
        self.renderer.clear(r, g, b, 1.0);
        self.glyph.draw(self.renderer.gl(), matrix);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.contexts.swap_buffers(self.surface)?;
        let window = self
            .contexts
            .window(self.surface)
            .context("Output surface disappeared")?;
        self.scanout.show(self.device, self.output, window)
    }
}

/// Rasterize the configured glyph and build its field
fn load_glyph(cfg: &Config) -> Result<PreparedGlyph> {
    let font_data = resolve_font(&cfg.glyph.family).context("Failed to load font")?;
    let mut rasterizer = FontdueRasterizer::new();
    rasterizer.add_face(&cfg.glyph.family, &font_data)?;
    prepare_glyph(&rasterizer, &cfg.glyph, &cfg.debug)
}

/// Fixed-rate frame loop until a shutdown signal arrives
fn run(driver: &mut FrameDriver, target: &mut ScanoutTarget<'_>, fps: u32) -> Result<()> {
    // First frame also sets the mode
    driver.tick(target)?;
    info!("First frame presented");
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]);

    let mut ticker = Ticker::new(fps);
    while !kms::shutdown_requested() {
        ticker.wait();
        if kms::take_redraw_request() {
            driver.redraw(target)?;
        } else {
            driver.tick(target)?;
        }
    }

    info!("Shutdown requested after {} frames", driver.frame());
    let _ = sd_notify::notify(true, &[sd_notify::NotifyState::Stopping]);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Check command line arguments
    let args: Vec<String> = std::env::args().collect();

    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("sdfglyph {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    info!("sdfglyph starting...");

    let cfg = Config::load();
    let glyph = load_glyph(&cfg)?;

    if args.iter().any(|a| a == "--test" || a == "-t") {
        info!("Test mode: skipping DRM initialization");
        eprintln!(
            "[OK] distance field {}x{} from {}x{} coverage",
            glyph.field.width(),
            glyph.field.height(),
            glyph.coverage.width(),
            glyph.coverage.height()
        );
        return Ok(());
    }

    kms::setup_signal_handlers();

    // Display
    let drm_device = kms::open_device(&cfg.display.device)?;
    if let Err(e) = drm_device.set_master() {
        warn!("{:#}", e);
    }
    let output = Output::auto_detect(&drm_device)?;

    // GBM + EGL
    let gbm_device = GbmDevice::new(drm_device.dup_fd()?)?;
    let gbm_surface = GbmSurface::new(gbm_device.device(), output.width, output.height)?;
    let egl = EglDisplay::new(gbm_device.device())?;

    let mut contexts = ContextManager::new(egl);
    let surface = output.surface_id();
    contexts.create(surface, gbm_surface)?;
    contexts.make_current(surface)?;

    let renderer = GlRenderer::new(contexts.backend())?;
    renderer.set_viewport(0, 0, output.width as i32, output.height as i32);

    let glyph_renderer = GlyphRenderer::new(
        renderer.gl(),
        renderer.es_version(),
        &glyph.field,
        cfg.render.zoom,
    )?;

    // Save original CRTC settings (restore on exit)
    let saved_crtc = SavedCrtc::save(&drm_device, &output).ok();

    let mut target = ScanoutTarget {
        device: &drm_device,
        output: &output,
        contexts: &contexts,
        surface,
        renderer: &renderer,
        glyph: &glyph_renderer,
        clear: cfg.render.clear_rgb(),
        scanout: Scanout::new(),
    };
    let mut driver = FrameDriver::new(cfg.render.angle_step_divisor);

    let result = run(&mut driver, &mut target, cfg.render.fps);
    if let Err(e) = &result {
        error!("Frame loop stopped: {:#}", e);
    }

    // Resource cleanup (frame on screen is released with the target)
    drop(target);
    glyph_renderer.destroy(renderer.gl());

    // Restore previous mode
    if let Some(crtc) = saved_crtc {
        crtc.restore(&drm_device, output.crtc_handle);
    }

    // EGL contexts and surfaces go before the GBM device
    drop(contexts);
    drop(gbm_device);

    info!("sdfglyph terminated");
    result
}
