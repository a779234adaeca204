//! Distance field texture
//!
//! Single-channel upload of a [`DistanceField`] to texture unit 0.

use anyhow::{anyhow, Result};
use glow::HasContext;
use log::debug;

use super::context::GlEsVersion;
use crate::sdf::DistanceField;

/// GL formats for a single-channel 8-bit texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleChannelFormat {
    pub internal_format: u32,
    pub format: u32,
    pub wrap: u32,
}

impl SingleChannelFormat {
    /// ES 3 samples `.r` from R8; ES 2 only has LUMINANCE, which also
    /// lands in `.r`. ES 2 cannot repeat non-power-of-two textures.
    pub fn for_version(version: GlEsVersion) -> Self {
        if version.is_es3() {
            Self {
                internal_format: glow::R8,
                format: glow::RED,
                wrap: glow::REPEAT,
            }
        } else {
            Self {
                internal_format: glow::LUMINANCE,
                format: glow::LUMINANCE,
                wrap: glow::CLAMP_TO_EDGE,
            }
        }
    }
}

/// Uploaded distance field
pub struct SdfTexture {
    texture: glow::Texture,
    width: u32,
    height: u32,
}

impl SdfTexture {
    /// Upload the field, replacing nothing (a fresh texture object)
    pub fn upload(gl: &glow::Context, version: GlEsVersion, field: &DistanceField) -> Result<Self> {
        let fmt = SingleChannelFormat::for_version(version);

        let texture = unsafe {
            let tex = gl
                .create_texture()
                .map_err(|e| anyhow!("Failed to create texture: {}", e))?;

            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(tex));

            // Rows are tightly packed
            gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);

            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                fmt.internal_format as i32,
                field.width() as i32,
                field.height() as i32,
                0,
                fmt.format,
                glow::UNSIGNED_BYTE,
                Some(field.data()),
            );

            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, fmt.wrap as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, fmt.wrap as i32);

            tex
        };

        debug!(
            "SDF texture uploaded: {}x{} ({})",
            field.width(),
            field.height(),
            if version.is_es3() { "R8" } else { "LUMINANCE" }
        );

        Ok(Self {
            texture,
            width: field.width(),
            height: field.height(),
        })
    }

    /// Bind to the given texture unit
    pub fn bind(&self, gl: &glow::Context, unit: u32) {
        unsafe {
            gl.active_texture(glow::TEXTURE0 + unit);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Release resources
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_texture(self.texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_per_version() {
        let es3 = SingleChannelFormat::for_version(GlEsVersion { major: 3, minor: 2 });
        assert_eq!(es3.internal_format, glow::R8);
        assert_eq!(es3.format, glow::RED);
        assert_eq!(es3.wrap, glow::REPEAT);

        let es2 = SingleChannelFormat::for_version(GlEsVersion { major: 2, minor: 0 });
        assert_eq!(es2.format, glow::LUMINANCE);
        assert_eq!(es2.wrap, glow::CLAMP_TO_EDGE);
    }
}
