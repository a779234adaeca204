//! Configuration file management
//!
//! Loads TOML configuration files and provides application settings.
//! Default config path: ~/.config/sdfglyph/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::sdf::{SdfError, SdfParams};

/// Upper bounds applied by [`Config::validated`]
///
/// `MAX_FILTER_WIDTH * MAX_SAMPLING` equals [`SdfParams::MAX_RADIUS`].
pub const MAX_SAMPLING: u32 = 32;
pub const MAX_FILTER_WIDTH: u32 = 32;
pub const MAX_TEX_SIZE: u32 = 512;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glyph and distance field settings
    pub glyph: GlyphConfig,
    /// Rendering settings
    pub render: RenderConfig,
    /// Display settings
    pub display: DisplayConfig,
    /// Debug output settings
    pub debug: DebugConfig,
}

/// Glyph settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlyphConfig {
    /// Font family name or absolute path to a font file
    pub family: String,
    /// Text to render (only the first character is used)
    pub text: String,
    /// Distance field texel budget per glyph side
    pub tex_size: u32,
    /// Source pixels per field texel
    pub sampling: u32,
    /// Field padding and distance range in texels
    pub filter_width: u32,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            family: "serif".to_string(),
            text: "g".to_string(),
            tex_size: 64,
            sampling: 8,
            filter_width: 8,
        }
    }
}

impl GlyphConfig {
    /// Rasterization size in pixels
    pub fn font_size(&self) -> f32 {
        self.tex_size as f32 * self.sampling as f32
    }

    pub fn sdf_params(&self) -> Result<SdfParams, SdfError> {
        SdfParams::new(self.sampling, self.filter_width)
    }
}

/// Rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Texture coordinate scale across the quad
    pub zoom: f32,
    /// Clear color (RRGGBB)
    pub clear_color: String,
    /// Frame rate
    pub fps: u32,
    /// Frames per π/360 of rotation
    pub angle_step_divisor: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            zoom: 2.0,
            clear_color: "00ff00".to_string(),
            fps: 60,
            angle_step_divisor: 3.0,
        }
    }
}

impl RenderConfig {
    /// Clear color as normalized RGB
    pub fn clear_rgb(&self) -> (f32, f32, f32) {
        parse_hex_color(&self.clear_color)
    }
}

/// Display settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// DRM device path (empty = auto-detect /dev/dri/card*)
    pub device: String,
}

/// Debug output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Write the coverage bitmap as PNG before building the field
    pub write_snapshot: bool,
    /// Snapshot file path
    pub snapshot_path: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            write_snapshot: true,
            snapshot_path: "glyph.png".to_string(),
        }
    }
}

/// Parse hex color string (RRGGBB) to normalized RGB tuple (0.0-1.0)
pub fn parse_hex_color(hex: &str) -> (f32, f32, f32) {
    let hex = hex.trim_start_matches('#');
    if hex.len() >= 6 && hex.is_char_boundary(6) {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        ) {
            return (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        }
    }
    // Fallback to black
    (0.0, 0.0, 0.0)
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/sdfglyph/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. SDFGLYPH_CONFIG environment variable
        if let Ok(path) = std::env::var("SDFGLYPH_CONFIG") {
            let p = std::path::Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/sdfglyph/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("sdfglyph").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/sdfglyph/config.toml
        let system_config = std::path::Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. SDFGLYPH_CONFIG environment variable
    /// 2. ~/.config/sdfglyph/config.toml (user config)
    /// 3. /etc/sdfglyph/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(path.to_string_lossy().as_ref()) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config.validated();
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Parse settings from TOML text (missing keys take defaults)
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Clamp out-of-range values, logging each correction
    pub fn validated(mut self) -> Self {
        if self.glyph.sampling == 0 {
            warn!("glyph.sampling must be at least 1, using 1");
            self.glyph.sampling = 1;
        } else if self.glyph.sampling > MAX_SAMPLING {
            warn!(
                "glyph.sampling {} too large, using {}",
                self.glyph.sampling, MAX_SAMPLING
            );
            self.glyph.sampling = MAX_SAMPLING;
        }
        if self.glyph.filter_width == 0 {
            warn!("glyph.filter_width must be at least 1, using 1");
            self.glyph.filter_width = 1;
        } else if self.glyph.filter_width > MAX_FILTER_WIDTH {
            warn!(
                "glyph.filter_width {} too large, using {}",
                self.glyph.filter_width, MAX_FILTER_WIDTH
            );
            self.glyph.filter_width = MAX_FILTER_WIDTH;
        }
        if self.glyph.tex_size == 0 {
            warn!("glyph.tex_size must be at least 1, using default");
            self.glyph.tex_size = GlyphConfig::default().tex_size;
        } else if self.glyph.tex_size > MAX_TEX_SIZE {
            warn!(
                "glyph.tex_size {} too large, using {}",
                self.glyph.tex_size, MAX_TEX_SIZE
            );
            self.glyph.tex_size = MAX_TEX_SIZE;
        }
        if self.glyph.text.is_empty() {
            warn!("glyph.text is empty, using default");
            self.glyph.text = GlyphConfig::default().text;
        }
        if !(1..=240).contains(&self.render.fps) {
            let fps = self.render.fps.clamp(1, 240);
            warn!("render.fps {} out of range, using {}", self.render.fps, fps);
            self.render.fps = fps;
        }
        if !(self.render.zoom > 0.0 && self.render.zoom.is_finite()) {
            warn!("render.zoom must be positive, using default");
            self.render.zoom = RenderConfig::default().zoom;
        }
        if !(self.render.angle_step_divisor > 0.0 && self.render.angle_step_divisor.is_finite()) {
            warn!("render.angle_step_divisor must be positive, using default");
            self.render.angle_step_divisor = RenderConfig::default().angle_step_divisor;
        }
        self
    }
}
