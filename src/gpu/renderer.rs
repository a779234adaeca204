//! Glyph drawing renderer
//!
//! Combine the distance field texture, quad and reconstruction shader
//! to draw the glyph on GPU

use anyhow::Result;
use log::info;

use super::context::GlEsVersion;
use super::quad::{QuadBuffer, QuadGeometry};
use super::shader::SdfShader;
use super::texture::SdfTexture;
use crate::sdf::DistanceField;

/// Distance field glyph renderer
pub struct GlyphRenderer {
    shader: SdfShader,
    texture: SdfTexture,
    quad: QuadBuffer,
}

impl GlyphRenderer {
    /// Upload the field and build the shader and quad
    pub fn new(
        gl: &glow::Context,
        version: GlEsVersion,
        field: &DistanceField,
        zoom: f32,
    ) -> Result<Self> {
        let shader = SdfShader::new(gl, version, field.params().radius())?;
        let texture = SdfTexture::upload(gl, version, field)?;
        let quad = QuadBuffer::new(gl, &QuadGeometry::new(zoom))?;

        shader.bind(gl);
        shader.set_texture_unit(gl, 0);

        info!(
            "Glyph renderer initialized ({}x{} field, zoom {})",
            texture.width(),
            texture.height(),
            zoom
        );
        Ok(Self {
            shader,
            texture,
            quad,
        })
    }

    /// Draw the quad with the given view-projection matrix
    pub fn draw(&self, gl: &glow::Context, matrix: &[f32; 16]) {
        self.shader.bind(gl);
        self.shader.set_matrix(gl, matrix);
        self.texture.bind(gl, 0);
        self.quad.draw(gl);
    }

    /// Release resources
    pub fn destroy(&self, gl: &glow::Context) {
        self.quad.destroy(gl);
        self.texture.destroy(gl);
        self.shader.destroy(gl);
    }
}
