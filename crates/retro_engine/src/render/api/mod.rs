//! Backend abstraction for the rendering system
//!
//! This module defines the device trait that graphics backends must
//! implement to provide a consistent interface for the high-level renderer,
//! plus a headless tracing implementation used by tests and demos.

pub mod device;
pub mod trace_device;

pub use device::{
    BlendMode, Capability, ClearMask, ClientArray, CullWinding, DeviceError, DeviceResult,
    GraphicsDevice, TextureFlags, TextureFormat, TextureHandle, TextureUpload, TriangleDraw,
};
pub use trace_device::{DeviceCall, TraceDevice};
