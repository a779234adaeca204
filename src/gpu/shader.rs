//! Shader management
//!
//! Distance field reconstruction shader (GLSL ES 3.00 with a GLSL ES 1.00
//! fallback), compilation and linking. The fragment math is mirrored on the
//! CPU by [`transition_half_width`] and [`reconstruct_alpha`].

use glow::HasContext;
use log::{error, info};
use thiserror::Error;

use super::context::GlEsVersion;

/// Attribute location of `a_position`
pub const ATTRIB_POSITION: u32 = 0;
/// Attribute location of `a_texCoord`
pub const ATTRIB_TEX_COORD: u32 = 1;

/// Shader compile/link failures (the driver's info log is kept verbatim)
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to create {0} object: {1}")]
    Create(&'static str, String),
    #[error("{stage} shader compile failed: {log}")]
    Compile { stage: &'static str, log: String },
    #[error("shader link failed: {log}")]
    Link { log: String },
    #[error("uniform \"{0}\" not found")]
    MissingUniform(&'static str),
}

/// Vertex shader body (GLSL ES 3.00)
const SDF_VERTEX_SHADER_300: &str = r#"
in vec4 a_position;
in vec2 a_texCoord;

uniform mat4 u_matViewProjection;

out vec2 v_texCoord;

void main() {
    gl_Position = u_matViewProjection * a_position;
    v_texCoord = a_texCoord;
}
"#;

/// Fragment shader body (GLSL ES 3.00)
///
/// The band half-width follows the screen-space derivative of the texture
/// coordinate, so edges stay about one pixel wide at any zoom.
/// `v_texCoord.s >= 5` only happens for zoom factors above 5 and swaps the
/// colors.
const SDF_FRAGMENT_SHADER_300: &str = r#"
precision highp float;

in vec2 v_texCoord;

uniform sampler2D tex;

out vec4 frag_color;

void main() {
    float ddx = length(dFdx(v_texCoord));
    float ddy = length(dFdy(v_texCoord));
    float m = max(ddx, ddy);
    float mm = m * 128.0 / SDF_RADIUS;

    float alpha = smoothstep(-mm, mm, texture(tex, v_texCoord).r - 0.5);

    if (v_texCoord.s < 5.0)
        frag_color = mix(vec4(0.0, 0.0, 0.0, 1.0), vec4(1.0, 1.0, 1.0, 1.0), alpha);
    else
        frag_color = mix(vec4(1.0, 1.0, 1.0, 1.0), vec4(0.0, 0.0, 0.0, 1.0), alpha);
}
"#;

/// Vertex shader body (GLSL ES 1.00)
const SDF_VERTEX_SHADER_100: &str = r#"
attribute vec4 a_position;
attribute vec2 a_texCoord;

uniform mat4 u_matViewProjection;

varying vec2 v_texCoord;

void main() {
    gl_Position = u_matViewProjection * a_position;
    v_texCoord = a_texCoord;
}
"#;

/// Fragment shader body (GLSL ES 1.00, needs OES_standard_derivatives)
const SDF_FRAGMENT_SHADER_100: &str = r#"
#extension GL_OES_standard_derivatives : enable
#ifdef GL_FRAGMENT_PRECISION_HIGH
precision highp float;
#else
precision mediump float;
#endif

varying vec2 v_texCoord;

uniform sampler2D tex;

void main() {
    float ddx = length(dFdx(v_texCoord));
    float ddy = length(dFdy(v_texCoord));
    float m = max(ddx, ddy);
    float mm = m * 128.0 / SDF_RADIUS;

    float alpha = smoothstep(-mm, mm, texture2D(tex, v_texCoord).r - 0.5);

    if (v_texCoord.s < 5.0)
        gl_FragColor = mix(vec4(0.0, 0.0, 0.0, 1.0), vec4(1.0, 1.0, 1.0, 1.0), alpha);
    else
        gl_FragColor = mix(vec4(1.0, 1.0, 1.0, 1.0), vec4(0.0, 0.0, 0.0, 1.0), alpha);
}
"#;

/// Complete shader sources for one GLSL dialect
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    /// Sources for the detected ES version, with the field radius baked in
    pub fn for_version(version: GlEsVersion, radius: u32) -> Self {
        if version.is_es3() {
            Self {
                vertex: with_header("#version 300 es", radius, SDF_VERTEX_SHADER_300),
                fragment: with_header("#version 300 es", radius, SDF_FRAGMENT_SHADER_300),
            }
        } else {
            Self {
                vertex: with_header("#version 100", radius, SDF_VERTEX_SHADER_100),
                fragment: with_header("#version 100", radius, SDF_FRAGMENT_SHADER_100),
            }
        }
    }
}

/// `#version` must be the first line; the define follows it
fn with_header(version_line: &str, radius: u32, body: &str) -> String {
    format!(
        "{}\n#define SDF_RADIUS {}.0\n{}",
        version_line, radius, body
    )
}

/// Compiled reconstruction shader program
pub struct SdfShader {
    program: glow::Program,
    pub u_mat_view_projection: glow::UniformLocation,
    pub u_tex: glow::UniformLocation,
}

impl SdfShader {
    /// Compile and link for the given ES version and field radius
    /// (`filter_width * sampling`)
    pub fn new(gl: &glow::Context, version: GlEsVersion, radius: u32) -> Result<Self, ShaderError> {
        let sources = ShaderSources::for_version(version, radius);
        let program = compile_program(gl, &sources.vertex, &sources.fragment)?;

        let (u_mat_view_projection, u_tex) = unsafe {
            match (
                gl.get_uniform_location(program, "u_matViewProjection"),
                gl.get_uniform_location(program, "tex"),
            ) {
                (Some(m), Some(t)) => (m, t),
                (m, _) => {
                    gl.delete_program(program);
                    let name = if m.is_none() { "u_matViewProjection" } else { "tex" };
                    return Err(ShaderError::MissingUniform(name));
                }
            }
        };

        info!(
            "SDF shader compiled (GLSL ES {}, radius {})",
            if version.is_es3() { "3.00" } else { "1.00" },
            radius
        );
        Ok(Self {
            program,
            u_mat_view_projection,
            u_tex,
        })
    }

    /// Activate the shader
    pub fn bind(&self, gl: &glow::Context) {
        unsafe {
            gl.use_program(Some(self.program));
        }
    }

    /// Set view-projection matrix (column-major)
    pub fn set_matrix(&self, gl: &glow::Context, matrix: &[f32; 16]) {
        unsafe {
            gl.uniform_matrix_4_f32_slice(Some(&self.u_mat_view_projection), false, matrix);
        }
    }

    /// Set distance field texture unit
    pub fn set_texture_unit(&self, gl: &glow::Context, unit: i32) {
        unsafe {
            gl.uniform_1_i32(Some(&self.u_tex), unit);
        }
    }

    /// Release resources
    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.program);
        }
    }
}

/// Half-width of the anti-aliasing band in normalized field units
///
/// `m` is the larger screen-space derivative length of the texture
/// coordinate. Linear in `m`.
pub fn transition_half_width(m: f32, radius: u32) -> f32 {
    m * 128.0 / radius as f32
}

/// GLSL `smoothstep`
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Coverage the fragment shader computes for a sampled field value
///
/// `sample` is the texel normalized to [0, 1].
pub fn reconstruct_alpha(sample: f32, m: f32, radius: u32) -> f32 {
    let mm = transition_half_width(m, radius);
    smoothstep(-mm, mm, sample - 0.5)
}

/// Compile shader and link program
///
/// Attribute locations are bound before linking so ES 2 and ES 3 sources
/// share the same vertex layout.
fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, ShaderError> {
    unsafe {
        let vs = compile_shader(gl, glow::VERTEX_SHADER, vertex_src)?;
        let fs = match compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(e);
            }
        };

        let program = gl
            .create_program()
            .map_err(|e| ShaderError::Create("program", e))?;

        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.bind_attrib_location(program, ATTRIB_POSITION, "a_position");
        gl.bind_attrib_location(program, ATTRIB_TEX_COORD, "a_texCoord");
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            error!("Shader link failed:\n{}", log);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(ShaderError::Link { log });
        }

        // Shader objects no longer needed after linking
        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);

        Ok(program)
    }
}

/// Compile individual shader
fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    let stage = match shader_type {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    };
    unsafe {
        let shader = gl
            .create_shader(shader_type)
            .map_err(|e| ShaderError::Create("shader", e))?;

        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            error!("{} shader compile failed:\n{}", stage, log);
            gl.delete_shader(shader);
            return Err(ShaderError::Compile { stage, log });
        }

        Ok(shader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ES3: GlEsVersion = GlEsVersion { major: 3, minor: 0 };
    const ES2: GlEsVersion = GlEsVersion { major: 2, minor: 0 };

    #[test]
    fn test_sources_start_with_version() {
        let s = ShaderSources::for_version(ES3, 64);
        assert!(s.vertex.starts_with("#version 300 es\n#define SDF_RADIUS 64.0\n"));
        assert!(s.fragment.starts_with("#version 300 es\n"));
        assert!(s.fragment.contains("texture(tex, v_texCoord)"));

        let s = ShaderSources::for_version(ES2, 16);
        assert!(s.vertex.starts_with("#version 100\n#define SDF_RADIUS 16.0\n"));
        assert!(s.fragment.contains("GL_OES_standard_derivatives"));
        assert!(s.fragment.contains("gl_FragColor"));
    }

    #[test]
    fn test_half_width_is_linear_in_derivative() {
        let radius = 64;
        let full = transition_half_width(0.02, radius);
        let half = transition_half_width(0.01, radius);
        assert!((full - 2.0 * half).abs() < 1e-6);
        assert!((transition_half_width(0.5, radius) - 1.0).abs() < 1e-6);
        assert_eq!(transition_half_width(0.0, radius), 0.0);
    }

    #[test]
    fn test_smoothstep() {
        assert_eq!(smoothstep(-1.0, 1.0, -2.0), 0.0);
        assert_eq!(smoothstep(-1.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(-1.0, 1.0, 0.0) - 0.5).abs() < 1e-6);
        // Degenerate band acts as a step
        assert_eq!(smoothstep(0.0, 0.0, -0.1), 0.0);
        assert_eq!(smoothstep(0.0, 0.0, 0.1), 1.0);
    }

    #[test]
    fn test_alpha_across_edge() {
        let radius = 64;
        let m = 0.05;
        // Edge value 128/255 sits right at the midpoint
        assert!((reconstruct_alpha(0.5, m, radius) - 0.5).abs() < 1e-6);
        assert_eq!(reconstruct_alpha(0.0, m, radius), 0.0);
        assert_eq!(reconstruct_alpha(1.0, m, radius), 1.0);
        // Monotone across the band
        let a = reconstruct_alpha(0.45, m, radius);
        let b = reconstruct_alpha(0.55, m, radius);
        assert!(a < 0.5 && b > 0.5);
    }

    #[test]
    fn test_narrower_band_when_zoomed_in() {
        let radius = 64;
        let sample = 0.52;
        // Halving the derivative halves the band, so the same sample
        // lands further into the inside
        let wide = reconstruct_alpha(sample, 0.02, radius);
        let narrow = reconstruct_alpha(sample, 0.01, radius);
        assert!(narrow > wide);
    }
}
