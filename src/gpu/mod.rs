//! GPU rendering with OpenGL ES
//!
//! Handles:
//! - GBM device/surface creation
//! - EGL display setup (GBM platform) and per-surface contexts
//! - Distance field texture, quad and reconstruction shader

pub mod context;
pub mod quad;
pub mod renderer;
pub mod shader;
pub mod surfaces;
pub mod texture;

pub use context::{EglDisplay, GbmDevice, GbmSurface, GlEsVersion, GlRenderer};
pub use renderer::GlyphRenderer;
pub use shader::{SdfShader, ShaderError};
pub use surfaces::{ContextManager, SurfaceBackend, SurfaceId};
pub use texture::SdfTexture;
