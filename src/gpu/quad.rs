//! Full-screen quad
//!
//! Four vertices drawn as a triangle fan. Texture coordinates run to
//! `zoom`, so the glyph tiles `zoom × zoom` times across the quad.

use anyhow::{anyhow, Result};
use glow::HasContext;

use super::shader::{ATTRIB_POSITION, ATTRIB_TEX_COORD};

/// Per-vertex data: position(3) + UV(2) = 5 floats
pub const VERTEX_FLOATS: usize = 5;
/// Quad vertex count
pub const VERTEX_COUNT: usize = 4;

/// CPU side of the quad
#[derive(Debug, Clone, PartialEq)]
pub struct QuadGeometry {
    vertices: [f32; VERTEX_FLOATS * VERTEX_COUNT],
}

impl QuadGeometry {
    /// Quad covering clip space (-1..1) with UVs scaled by `zoom`
    ///
    /// V is flipped so the bitmap's top row is at the top of the screen.
    #[rustfmt::skip]
    pub fn new(zoom: f32) -> Self {
        Self {
            vertices: [
                // x,    y,    z,   u,    v
                -1.0, -1.0, 0.0, 0.0,  zoom,
                 1.0, -1.0, 0.0, zoom, zoom,
                 1.0,  1.0, 0.0, zoom, 0.0,
                -1.0,  1.0, 0.0, 0.0,  0.0,
            ],
        }
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Position of vertex `i`
    pub fn position(&self, i: usize) -> [f32; 3] {
        let v = &self.vertices[i * VERTEX_FLOATS..];
        [v[0], v[1], v[2]]
    }

    /// Texture coordinate of vertex `i`
    pub fn tex_coord(&self, i: usize) -> [f32; 2] {
        let v = &self.vertices[i * VERTEX_FLOATS + 3..];
        [v[0], v[1]]
    }
}

/// Quad uploaded to a vertex buffer
///
/// No VAO: attribute pointers are set on every draw so ES 2 works unchanged.
pub struct QuadBuffer {
    vbo: glow::Buffer,
}

impl QuadBuffer {
    pub fn new(gl: &glow::Context, geometry: &QuadGeometry) -> Result<Self> {
        unsafe {
            let vbo = gl
                .create_buffer()
                .map_err(|e| anyhow!("Failed to create VBO: {}", e))?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                cast_slice(geometry.vertices()),
                glow::STATIC_DRAW,
            );
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(Self { vbo })
        }
    }

    /// Bind the buffer, point the attributes at it and draw
    pub fn draw(&self, gl: &glow::Context) {
        let stride = (VERTEX_FLOATS * 4) as i32;
        unsafe {
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));

            // a_position: vec3 (w defaults to 1)
            gl.enable_vertex_attrib_array(ATTRIB_POSITION);
            gl.vertex_attrib_pointer_f32(ATTRIB_POSITION, 3, glow::FLOAT, false, stride, 0);

            // a_texCoord: vec2
            gl.enable_vertex_attrib_array(ATTRIB_TEX_COORD);
            gl.vertex_attrib_pointer_f32(ATTRIB_TEX_COORD, 2, glow::FLOAT, false, stride, 12);

            gl.draw_arrays(glow::TRIANGLE_FAN, 0, VERTEX_COUNT as i32);

            gl.disable_vertex_attrib_array(ATTRIB_POSITION);
            gl.disable_vertex_attrib_array(ATTRIB_TEX_COORD);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    /// Release resources
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_buffer(self.vbo);
        }
    }
}

/// &[f32] -> &[u8] conversion
fn cast_slice(slice: &[f32]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, std::mem::size_of_val(slice)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_covers_clip_space() {
        let q = QuadGeometry::new(2.0);
        assert_eq!(q.position(0), [-1.0, -1.0, 0.0]);
        assert_eq!(q.position(1), [1.0, -1.0, 0.0]);
        assert_eq!(q.position(2), [1.0, 1.0, 0.0]);
        assert_eq!(q.position(3), [-1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_tex_coords_scale_with_zoom() {
        let q = QuadGeometry::new(2.0);
        assert_eq!(q.tex_coord(0), [0.0, 2.0]);
        assert_eq!(q.tex_coord(1), [2.0, 2.0]);
        assert_eq!(q.tex_coord(2), [2.0, 0.0]);
        assert_eq!(q.tex_coord(3), [0.0, 0.0]);

        let q = QuadGeometry::new(1.0);
        assert_eq!(q.tex_coord(1), [1.0, 1.0]);
    }

    #[test]
    fn test_byte_view_length() {
        let q = QuadGeometry::new(2.0);
        assert_eq!(cast_slice(q.vertices()).len(), VERTEX_FLOATS * VERTEX_COUNT * 4);
    }
}
