//! GPU context management
//!
//! GBM + EGL + OpenGL ES setup

use anyhow::{anyhow, Context, Result};
use gbm::AsRaw;
use glow::HasContext;
use khronos_egl as egl;
use log::info;
use std::ffi::c_void;

// EGL_PLATFORM_GBM_KHR (EGL extension)
const EGL_PLATFORM_GBM_KHR: egl::Enum = 0x31D7;

/// GBM device
pub struct GbmDevice {
    device: gbm::Device<std::fs::File>,
}

impl GbmDevice {
    /// Create GBM device from DRM file descriptor
    pub fn new(drm_file: std::fs::File) -> Result<Self> {
        let device = gbm::Device::new(drm_file)
            .map_err(|e| anyhow!("Failed to create GBM device: {:?}", e))?;
        info!("GBM device created");
        Ok(Self { device })
    }

    /// Reference to internal device
    pub fn device(&self) -> &gbm::Device<std::fs::File> {
        &self.device
    }
}

/// GBM surface
pub struct GbmSurface {
    surface: gbm::Surface<std::fs::File>,
    width: u32,
    height: u32,
}

impl GbmSurface {
    /// Create a scanout-capable GBM surface
    pub fn new(device: &gbm::Device<std::fs::File>, width: u32, height: u32) -> Result<Self> {
        let surface = device
            .create_surface::<std::fs::File>(
                width,
                height,
                gbm::Format::Argb8888,
                gbm::BufferObjectFlags::SCANOUT | gbm::BufferObjectFlags::RENDERING,
            )
            .map_err(|e| anyhow!("Failed to create GBM surface: {:?}", e))?;

        info!("GBM surface created: {}x{}", width, height);
        Ok(Self {
            surface,
            width,
            height,
        })
    }

    /// Reference to internal surface
    pub fn surface(&self) -> &gbm::Surface<std::fs::File> {
        &self.surface
    }

    /// Lock front buffer and get buffer object
    pub fn lock_front_buffer(&self) -> Result<gbm::BufferObject<std::fs::File>> {
        unsafe {
            self.surface
                .lock_front_buffer()
                .map_err(|e| anyhow!("Failed to lock front buffer: {:?}", e))
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// EGL instance type (dynamic loading)
pub type EglInstance = egl::Instance<egl::Dynamic<libloading::Library, egl::EGL1_5>>;

/// Initialized EGL display on the GBM platform
///
/// Contexts and surfaces created from it are owned by
/// [`ContextManager`](super::surfaces::ContextManager).
pub struct EglDisplay {
    instance: EglInstance,
    display: egl::Display,
    config: egl::Config,
}

impl EglDisplay {
    /// Load libEGL, open the GBM platform display and pick a config
    pub fn new(gbm_device: &gbm::Device<std::fs::File>) -> Result<Self> {
        // Load EGL library
        let lib = unsafe {
            libloading::Library::new("libEGL.so.1")
                .or_else(|_| libloading::Library::new("libEGL.so"))
                .context("Failed to load EGL library")?
        };

        let instance: EglInstance = unsafe {
            egl::DynamicInstance::<egl::EGL1_5>::load_required_from(lib)
                .context("Failed to create EGL instance")?
        };

        // Get display with GBM platform
        let display = unsafe {
            instance
                .get_platform_display(
                    EGL_PLATFORM_GBM_KHR,
                    gbm_device.as_raw() as *mut c_void,
                    &[egl::ATTRIB_NONE],
                )
                .context("Failed to get EGL display")?
        };

        instance
            .initialize(display)
            .context("Failed to initialize EGL")?;

        if let Ok(version_str) = instance.query_string(Some(display), egl::VERSION) {
            info!("EGL version: {}", version_str.to_string_lossy());
        }

        instance
            .bind_api(egl::OPENGL_ES_API)
            .context("Failed to bind OpenGL ES API")?;

        // Choose config (try ES3, fallback to ES2)
        let config = Self::choose_config(&instance, display, egl::OPENGL_ES3_BIT)
            .or_else(|_| Self::choose_config(&instance, display, egl::OPENGL_ES2_BIT))
            .context("Could not find EGL config")?;

        Ok(Self {
            instance,
            display,
            config,
        })
    }

    /// Create a context (try ES3, fallback to ES2)
    pub fn create_context(&self) -> Result<egl::Context> {
        let context_attribs_es3 = [egl::CONTEXT_CLIENT_VERSION, 3, egl::NONE];
        let context_attribs_es2 = [egl::CONTEXT_CLIENT_VERSION, 2, egl::NONE];
        self.instance
            .create_context(self.display, self.config, None, &context_attribs_es3)
            .or_else(|_| {
                self.instance
                    .create_context(self.display, self.config, None, &context_attribs_es2)
            })
            .context("Could not create EGL context")
    }

    /// Wrap a GBM surface in an EGL window surface
    pub fn create_window_surface(&self, gbm_surface: &GbmSurface) -> Result<egl::Surface> {
        let raw = gbm_surface.surface().as_raw() as *mut c_void;
        unsafe {
            self.instance
                .create_platform_window_surface(
                    self.display,
                    self.config,
                    raw,
                    &[egl::ATTRIB_NONE],
                )
                .or_else(|_| {
                    self.instance.create_window_surface(
                        self.display,
                        self.config,
                        raw as egl::NativeWindowType,
                        None,
                    )
                })
                .context("Could not create EGL surface")
        }
    }

    pub fn make_current(&self, surface: egl::Surface, context: egl::Context) -> Result<()> {
        self.instance
            .make_current(self.display, Some(surface), Some(surface), Some(context))
            .context("Failed to make EGL context current")
    }

    pub fn release_current(&self) {
        let _ = self.instance.make_current(self.display, None, None, None);
    }

    pub fn swap_buffers(&self, surface: egl::Surface) -> Result<()> {
        self.instance
            .swap_buffers(self.display, surface)
            .context("Failed to swap buffers")
    }

    pub fn destroy_surface(&self, surface: egl::Surface) {
        let _ = self.instance.destroy_surface(self.display, surface);
    }

    pub fn destroy_context(&self, context: egl::Context) {
        let _ = self.instance.destroy_context(self.display, context);
    }

    /// Choose EGL config
    fn choose_config(
        instance: &EglInstance,
        display: egl::Display,
        renderable_type: egl::Int,
    ) -> Result<egl::Config> {
        let config_attribs = [
            egl::SURFACE_TYPE,
            egl::WINDOW_BIT,
            egl::RED_SIZE,
            8,
            egl::GREEN_SIZE,
            8,
            egl::BLUE_SIZE,
            8,
            egl::ALPHA_SIZE,
            8,
            egl::DEPTH_SIZE,
            0,
            egl::RENDERABLE_TYPE,
            renderable_type,
            egl::NONE,
        ];

        instance
            .choose_first_config(display, &config_attribs)
            .context("choose_first_config failed")?
            .ok_or_else(|| anyhow!("No suitable EGL config found"))
    }

    /// Load GL function pointers
    pub fn get_proc_address(&self, name: &str) -> *const c_void {
        self.instance
            .get_proc_address(name)
            .map(|f| f as *const c_void)
            .unwrap_or(std::ptr::null())
    }
}

impl Drop for EglDisplay {
    fn drop(&mut self) {
        let _ = self.instance.terminate(self.display);
    }
}

/// OpenGL ES version
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlEsVersion {
    pub major: u32,
    pub minor: u32,
}

impl GlEsVersion {
    /// Parse version from GL_VERSION string (e.g., "OpenGL ES 3.1 Mesa 23.0.0")
    pub fn parse(version_str: &str) -> Self {
        // Look for "ES X.Y" pattern
        let default = Self { major: 2, minor: 0 };

        let es_pos = version_str.find("ES ");
        if let Some(pos) = es_pos {
            let after_es = &version_str[pos + 3..];
            let version_part: String = after_es
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();

            let parts: Vec<&str> = version_part.split('.').collect();
            if parts.len() >= 2 {
                if let (Ok(major), Ok(minor)) = (parts[0].parse(), parts[1].parse()) {
                    return Self { major, minor };
                }
            }
        }

        default
    }

    /// ES 3.0+ (GLSL ES 3.00, R8 textures, NPOT repeat)
    pub fn is_es3(&self) -> bool {
        self.major >= 3
    }
}

/// OpenGL ES renderer
pub struct GlRenderer {
    gl: glow::Context,
    es_version: GlEsVersion,
}

impl GlRenderer {
    /// Load GL entry points through EGL (a context must be current)
    pub fn new(egl: &EglDisplay) -> Result<Self> {
        let gl = unsafe { glow::Context::from_loader_function(|name| egl.get_proc_address(name)) };

        let es_version = unsafe {
            let version = gl.get_parameter_string(glow::VERSION);
            let renderer = gl.get_parameter_string(glow::RENDERER);
            let vendor = gl.get_parameter_string(glow::VENDOR);
            info!("OpenGL ES: {}", version);
            info!("Renderer: {}", renderer);
            info!("Vendor: {}", vendor);

            let es_ver = GlEsVersion::parse(&version);
            info!("Detected ES {}.{}", es_ver.major, es_ver.minor);
            es_ver
        };

        Ok(Self { gl, es_version })
    }

    /// Clear screen (fill with solid color)
    pub fn clear(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
    }

    /// Set viewport
    pub fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe {
            self.gl.viewport(x, y, width, height);
        }
    }

    /// Reference to glow context
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Get ES version
    pub fn es_version(&self) -> GlEsVersion {
        self.es_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_es_version() {
        let v = GlEsVersion::parse("OpenGL ES 3.1 Mesa 23.0.0");
        assert_eq!(v, GlEsVersion { major: 3, minor: 1 });
        assert!(v.is_es3());

        let v = GlEsVersion::parse("OpenGL ES 2.0 Mesa 20.3.5");
        assert!(!v.is_es3());

        // Unparseable strings fall back to ES 2.0
        let v = GlEsVersion::parse("garbage");
        assert_eq!(v, GlEsVersion { major: 2, minor: 0 });
    }
}
