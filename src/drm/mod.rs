//! DRM/KMS display management

pub mod device;
pub mod display;

pub use device::{open_device, setup_signal_handlers, shutdown_requested, take_redraw_request, Device};
pub use display::{set_crtc, DrmFramebuffer, Output, SavedCrtc, Scanout};
