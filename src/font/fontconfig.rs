//! fontconfig integration
//!
//! Resolve a font family name (e.g. "serif") to font file data

use anyhow::{anyhow, Result};
use fontconfig::Fontconfig;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Font search result
#[derive(Debug, Clone)]
pub struct FontMatch {
    /// Font file path
    pub path: PathBuf,
    /// Font name
    pub family: String,
}

/// Search fonts using fontconfig
pub struct FontFinder {
    fc: Fontconfig,
}

impl FontFinder {
    /// Initialize FontFinder
    pub fn new() -> Result<Self> {
        let fc = Fontconfig::new().ok_or_else(|| anyhow!("fontconfig initialization failed"))?;
        debug!("fontconfig initialized");
        Ok(Self { fc })
    }

    /// Search by font name
    ///
    /// fontconfig always returns the "closest" match, even if completely
    /// unrelated, so the result is checked against the requested name.
    pub fn find_font(&self, family: &str) -> Option<FontMatch> {
        let font = self.fc.find(family, None)?;
        if family_matches(family, &font.name) {
            return Some(FontMatch {
                path: font.path,
                family: font.name,
            });
        }
        warn!(
            "fontconfig: rejected false match for \"{}\": got \"{}\"",
            family, font.name
        );
        None
    }

    /// Search for a serif face
    pub fn find_serif(&self) -> Option<FontMatch> {
        let fallbacks = [
            "serif",
            "DejaVu Serif",
            "Liberation Serif",
            "Noto Serif",
            "FreeSerif",
            "Times New Roman",
        ];

        for name in fallbacks {
            if let Some(m) = self.find_font(name) {
                return Some(m);
            }
        }

        warn!("Serif font not found");
        None
    }
}

/// Whether fontconfig's answer plausibly is the requested family
///
/// Generic aliases ("serif", "sans-serif", "monospace") accept any face whose
/// name contains the alias's core word.
pub fn family_matches(requested: &str, got: &str) -> bool {
    let req = requested.to_ascii_lowercase();
    let got = got.to_ascii_lowercase();
    if got.contains(&req) || req.contains(&got) {
        return true;
    }
    match req.as_str() {
        "sans-serif" | "sans" => got.contains("sans"),
        "monospace" | "mono" => got.contains("mono"),
        _ => false,
    }
}

/// Well-known serif font locations, tried when fontconfig has nothing
const SERIF_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
    "/usr/share/fonts/TTF/DejaVuSerif.ttf",
    "/usr/share/fonts/dejavu-serif-fonts/DejaVuSerif.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
    "/usr/share/fonts/liberation-serif/LiberationSerif-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSerif-Regular.ttf",
    "/usr/share/fonts/noto/NotoSerif-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSerif.ttf",
];

/// Load font file
pub fn load_font_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| anyhow!("Failed to read font file: {} ({})", path.display(), e))
}

/// Resolve a font specifier to font data
///
/// Search order:
/// 1. SDFGLYPH_FONT environment variable (path)
/// 2. Specifier as an absolute file path
/// 3. Specifier as a family name via fontconfig
/// 4. Any serif face via fontconfig
/// 5. Known serif font paths
pub fn resolve_font(specifier: &str) -> Result<Vec<u8>> {
    if let Ok(path) = std::env::var("SDFGLYPH_FONT") {
        info!("Font loaded: {} (SDFGLYPH_FONT)", path);
        return load_font_file(Path::new(&path));
    }

    let path = Path::new(specifier);
    if path.is_absolute() && path.exists() {
        info!("Font loaded from path: {}", specifier);
        return load_font_file(path);
    }

    match FontFinder::new() {
        Ok(finder) => {
            let found = finder
                .find_font(specifier)
                .or_else(|| finder.find_serif());
            if let Some(font_match) = found {
                info!(
                    "Font resolved by name: \"{}\" → {} ({})",
                    specifier,
                    font_match.family,
                    font_match.path.display()
                );
                return load_font_file(&font_match.path);
            }
        }
        Err(e) => warn!("{}", e),
    }

    debug!("Not found via fontconfig, trying known paths");
    for candidate in SERIF_CANDIDATES {
        if let Ok(data) = std::fs::read(candidate) {
            info!("Font loaded: {}", candidate);
            return Ok(data);
        }
    }

    Err(anyhow!(
        "Font not found: \"{}\" (not a valid path or font name). Checked:\n{}",
        specifier,
        SERIF_CANDIDATES.join("\n")
    ))
}
