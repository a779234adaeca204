//! DRM device management
//!
//! Opens DRM device (/dev/dri/card*) and
//! enumerates available connectors, CRTCs, and encoders

use anyhow::{anyhow, Context, Result};
use drm::control::{connector, crtc, encoder, Device as ControlDevice, ResourceHandles};
use drm::Device as BasicDevice;
use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, FromRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag for shutdown requested via signal (SIGTERM/SIGINT/SIGHUP)
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Global flag for redraw requested via SIGUSR1
static REDRAW_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Check if shutdown was requested (SIGTERM, SIGINT, or SIGHUP)
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Take a pending redraw request (SIGUSR1), clearing it
pub fn take_redraw_request() -> bool {
    REDRAW_REQUESTED.swap(false, Ordering::Relaxed)
}

/// Set up signal handlers for graceful shutdown (call once at startup)
///
/// Handles SIGTERM (systemd stop), SIGINT (Ctrl+C), and SIGHUP (terminal hangup).
/// SIGUSR1 asks for the current frame to be shown again.
pub fn setup_signal_handlers() {
    unsafe {
        libc::signal(
            libc::SIGUSR1,
            redraw_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGTERM,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGINT,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
        libc::signal(
            libc::SIGHUP,
            shutdown_signal_handler as *const () as libc::sighandler_t,
        );
    }
}

extern "C" fn shutdown_signal_handler(_signo: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

extern "C" fn redraw_signal_handler(_signo: libc::c_int) {
    REDRAW_REQUESTED.store(true, Ordering::Relaxed);
}

/// Candidate device nodes, in probe order
pub fn card_paths() -> Vec<PathBuf> {
    (0..8)
        .map(|i| PathBuf::from(format!("/dev/dri/card{}", i)))
        .collect()
}

/// Open the configured device, or the first card with a connected display
pub fn open_device(configured: &str) -> Result<Device> {
    if !configured.is_empty() {
        return Device::open(configured);
    }

    for path in card_paths() {
        if !path.exists() {
            continue;
        }
        match Device::open(&path) {
            Ok(device) if device.find_connected_connector().is_ok() => return Ok(device),
            Ok(_) => debug!("{}: no connected display", path.display()),
            Err(e) => warn!("{}: {:#}", path.display(), e),
        }
    }
    Err(anyhow!("/dev/dri/card* with a connected display not found"))
}

/// DRM master state of one open device node
///
/// DROP_MASTER is only issued when SET_MASTER succeeded on this fd.
#[derive(Debug, Default)]
pub struct DrmMaster {
    held: AtomicBool,
}

impl DrmMaster {
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    /// Issue SET_MASTER on `fd`
    pub fn acquire(&self, fd: RawFd) -> Result<()> {
        let ret = unsafe { libc::ioctl(fd, drm_ioctl::DRM_IOCTL_SET_MASTER) };
        if ret < 0 {
            return Err(anyhow!(
                "SET_MASTER failed: {}",
                std::io::Error::last_os_error()
            ));
        }
        self.held.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Issue DROP_MASTER on `fd` if held; returns whether it was
    pub fn release(&self, fd: RawFd) -> bool {
        if !self.held.swap(false, Ordering::Relaxed) {
            return false;
        }
        unsafe {
            libc::ioctl(fd, drm_ioctl::DRM_IOCTL_DROP_MASTER);
        }
        true
    }
}

/// DRM device wrapper
pub struct Device {
    file: File,
    resources: ResourceHandles,
    master: DrmMaster,
}

// Trait implementations required by drm crate
impl AsFd for Device {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl BasicDevice for Device {}
impl ControlDevice for Device {}

impl Device {
    /// Open DRM device
    ///
    /// # Arguments
    /// * `path` - Device path (e.g., "/dev/dri/card0")
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening DRM device: {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Cannot open DRM device {}", path.display()))?;

        // Create temporary device wrapper to get resources
        struct TempDevice<'a>(&'a File);
        impl AsFd for TempDevice<'_> {
            fn as_fd(&self) -> BorrowedFd<'_> {
                self.0.as_fd()
            }
        }
        impl BasicDevice for TempDevice<'_> {}
        impl ControlDevice for TempDevice<'_> {}

        let resources = TempDevice(&file)
            .resource_handles()
            .context("Failed to get DRM resources")?;

        info!(
            "DRM resources: connectors={}, crtcs={}, encoders={}",
            resources.connectors().len(),
            resources.crtcs().len(),
            resources.encoders().len(),
        );

        Ok(Self {
            file,
            resources,
            master: DrmMaster::default(),
        })
    }

    /// Get connector info
    pub fn get_connector(&self, handle: connector::Handle) -> Result<connector::Info> {
        ControlDevice::get_connector(self, handle, false)
            .with_context(|| format!("Failed to get connector {:?} info", handle))
    }

    /// Get encoder info
    pub fn get_encoder(&self, handle: encoder::Handle) -> Result<encoder::Info> {
        ControlDevice::get_encoder(self, handle)
            .with_context(|| format!("Failed to get encoder {:?} info", handle))
    }

    /// Get CRTC info
    pub fn get_crtc(&self, handle: crtc::Handle) -> Result<crtc::Info> {
        ControlDevice::get_crtc(self, handle)
            .with_context(|| format!("Failed to get CRTC {:?} info", handle))
    }

    /// Get RawFd (needed for framebuffer ioctls)
    pub fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Duplicate fd and return as File (for GBM device)
    pub fn dup_fd(&self) -> Result<File> {
        let fd = unsafe { libc::dup(self.file.as_raw_fd()) };
        if fd < 0 {
            return Err(anyhow!(
                "fd dup failed: {}",
                std::io::Error::last_os_error()
            ));
        }
        Ok(unsafe { File::from_raw_fd(fd) })
    }

    /// Find connected connector
    pub fn find_connected_connector(&self) -> Result<(connector::Handle, connector::Info)> {
        for &handle in self.resources.connectors() {
            let info = self.get_connector(handle)?;
            if info.state() == connector::State::Connected {
                debug!("Found connected connector: {:?}", handle);
                return Ok((handle, info));
            }
        }
        Err(anyhow!("No connected connector found"))
    }

    /// Find CRTC for connector
    pub fn find_crtc_for_connector(
        &self,
        connector: &connector::Info,
    ) -> Result<(crtc::Handle, crtc::Info)> {
        // First check current encoder
        if let Some(encoder_handle) = connector.current_encoder() {
            let encoder = self.get_encoder(encoder_handle)?;
            if let Some(crtc_handle) = encoder.crtc() {
                let crtc = self.get_crtc(crtc_handle)?;
                return Ok((crtc_handle, crtc));
            }
        }

        // Find available encoder and CRTC
        for &encoder_handle in connector.encoders() {
            let encoder = self.get_encoder(encoder_handle)?;

            // Check CRTCs supported by encoder
            let possible = encoder.possible_crtcs();
            if let Some(crtc_handle) = self.resources.filter_crtcs(possible).into_iter().next() {
                let crtc = self.get_crtc(crtc_handle)?;
                return Ok((crtc_handle, crtc));
            }
        }

        Err(anyhow!("No CRTC found for connector"))
    }

    /// Acquire DRM master privileges
    ///
    /// Fails when another process (e.g. a compositor) holds master; mode
    /// setting then fails too.
    pub fn set_master(&self) -> Result<()> {
        self.master.acquire(self.file.as_raw_fd())?;
        info!("DRM master acquired");
        Ok(())
    }

    /// Whether this process holds DRM master on the device
    pub fn is_master(&self) -> bool {
        self.master.is_held()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Release DRM master privileges
        if self.master.release(self.file.as_raw_fd()) {
            debug!("DRM master dropped");
        }
    }
}

mod drm_ioctl {
    // Linux: include/uapi/drm/drm.h
    // _IO('d', 0x1e) = SET_MASTER, _IO('d', 0x1f) = DROP_MASTER
    const DRM_IOCTL_BASE: u64 = 0x64;
    pub const DRM_IOCTL_SET_MASTER: libc::c_ulong =
        nix::request_code_none!(DRM_IOCTL_BASE, 0x1e) as libc::c_ulong;
    pub const DRM_IOCTL_DROP_MASTER: libc::c_ulong =
        nix::request_code_none!(DRM_IOCTL_BASE, 0x1f) as libc::c_ulong;
}
