//! sdfglyph: a glyph rendered from a signed distance field
//!
//! A character is rasterized at high resolution, reduced to a compact
//! distance field and drawn on a rotating quad through DRM/KMS, where the
//! fragment shader reconstructs a crisp edge at any magnification.

pub mod config;
pub mod drm;
pub mod font;
pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod sdf;
pub mod snapshot;
