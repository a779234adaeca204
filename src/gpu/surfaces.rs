//! Per-surface EGL state
//!
//! Every output surface owns a window surface and a context. The manager
//! keeps them keyed by [`SurfaceId`] and tears everything down on drop, so
//! no EGL object outlives the display it came from.

use anyhow::{anyhow, bail, Result};
use khronos_egl as egl;
use log::{debug, info};
use std::collections::HashMap;

use super::context::{EglDisplay, GbmSurface};

/// Output surface key (the CRTC driving it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

impl From<drm::control::crtc::Handle> for SurfaceId {
    fn from(handle: drm::control::crtc::Handle) -> Self {
        Self(u32::from(handle))
    }
}

/// Operations the manager needs from a windowing API
pub trait SurfaceBackend {
    /// Native window the surface renders into
    type Window;
    type Surface: Copy;
    type Context: Copy;

    fn create_context(&self) -> Result<Self::Context>;
    fn create_surface(&self, window: &Self::Window) -> Result<Self::Surface>;
    fn make_current(&self, surface: Self::Surface, context: Self::Context) -> Result<()>;
    fn release_current(&self);
    fn swap_buffers(&self, surface: Self::Surface) -> Result<()>;
    fn destroy_surface(&self, surface: Self::Surface);
    fn destroy_context(&self, context: Self::Context);
}

impl SurfaceBackend for EglDisplay {
    type Window = GbmSurface;
    type Surface = egl::Surface;
    type Context = egl::Context;

    fn create_context(&self) -> Result<egl::Context> {
        EglDisplay::create_context(self)
    }

    fn create_surface(&self, window: &GbmSurface) -> Result<egl::Surface> {
        self.create_window_surface(window)
    }

    fn make_current(&self, surface: egl::Surface, context: egl::Context) -> Result<()> {
        EglDisplay::make_current(self, surface, context)
    }

    fn release_current(&self) {
        EglDisplay::release_current(self)
    }

    fn swap_buffers(&self, surface: egl::Surface) -> Result<()> {
        EglDisplay::swap_buffers(self, surface)
    }

    fn destroy_surface(&self, surface: egl::Surface) {
        EglDisplay::destroy_surface(self, surface)
    }

    fn destroy_context(&self, context: egl::Context) {
        EglDisplay::destroy_context(self, context)
    }
}

/// Window plus the EGL objects bound to it
pub struct SurfaceBinding<B: SurfaceBackend> {
    window: B::Window,
    surface: B::Surface,
    context: B::Context,
}

impl<B: SurfaceBackend> SurfaceBinding<B> {
    pub fn window(&self) -> &B::Window {
        &self.window
    }
}

/// Owner of all per-surface rendering state
pub struct ContextManager<B: SurfaceBackend = EglDisplay> {
    backend: B,
    bindings: HashMap<SurfaceId, SurfaceBinding<B>>,
    current: Option<SurfaceId>,
}

impl<B: SurfaceBackend> ContextManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            bindings: HashMap::new(),
            current: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create a context and window surface for `id`
    pub fn create(&mut self, id: SurfaceId, window: B::Window) -> Result<()> {
        if self.bindings.contains_key(&id) {
            bail!("Surface {:?} already has a context", id);
        }

        let context = self.backend.create_context()?;
        let surface = match self.backend.create_surface(&window) {
            Ok(s) => s,
            Err(e) => {
                self.backend.destroy_context(context);
                return Err(e);
            }
        };

        self.bindings.insert(
            id,
            SurfaceBinding {
                window,
                surface,
                context,
            },
        );
        info!("Rendering context created for surface {}", id.0);
        Ok(())
    }

    /// Make the context of `id` current on this thread
    pub fn make_current(&mut self, id: SurfaceId) -> Result<()> {
        let binding = self.binding(id)?;
        self.backend
            .make_current(binding.surface, binding.context)?;
        self.current = Some(id);
        Ok(())
    }

    pub fn swap_buffers(&self, id: SurfaceId) -> Result<()> {
        let binding = self.binding(id)?;
        self.backend.swap_buffers(binding.surface)
    }

    /// Native window of `id`
    pub fn window(&self, id: SurfaceId) -> Option<&B::Window> {
        self.bindings.get(&id).map(SurfaceBinding::window)
    }

    pub fn current(&self) -> Option<SurfaceId> {
        self.current
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.bindings.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Destroy the surface and context of `id`, returning whether it existed
    pub fn destroy(&mut self, id: SurfaceId) -> bool {
        let Some(binding) = self.bindings.remove(&id) else {
            return false;
        };
        if self.current == Some(id) {
            self.backend.release_current();
            self.current = None;
        }
        self.release(binding);
        debug!("Rendering context destroyed for surface {}", id.0);
        true
    }

    fn binding(&self, id: SurfaceId) -> Result<&SurfaceBinding<B>> {
        self.bindings
            .get(&id)
            .ok_or_else(|| anyhow!("No rendering context for surface {}", id.0))
    }

    fn release(&self, binding: SurfaceBinding<B>) {
        self.backend.destroy_surface(binding.surface);
        self.backend.destroy_context(binding.context);
        // Window (GBM surface) dropped here, after its EGL surface
    }
}

impl<B: SurfaceBackend> Drop for ContextManager<B> {
    fn drop(&mut self) {
        if self.current.take().is_some() {
            self.backend.release_current();
        }
        let bindings: Vec<_> = self.bindings.drain().collect();
        for (_, binding) in bindings {
            self.release(binding);
        }
    }
}
