//! Graphics device abstraction
//!
//! This trait models a fixed-function-style immediate-mode pipeline:
//! capability toggles, client vertex arrays, a single 2D texture bind
//! point, matrix stacks, and indexed triangle draws. It is the seam between
//! the renderer core and whatever graphics API actually executes the calls.
//!
//! ## Design Notes
//!
//! The renderer never calls the device directly for cached state; those
//! calls go through the state cache so redundant transitions are
//! suppressed. Everything here is assumed cheap to *call* but potentially
//! expensive to *execute*, which is why the caching layer above exists.

use crate::foundation::math::Mat4;
use bitflags::bitflags;
use thiserror::Error;

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors reported by a graphics device
///
/// A device error means the underlying context is in an unusable state.
/// The renderer propagates these without retrying; callers should treat
/// them as unrecoverable.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The graphics context was lost or never valid
    #[error("graphics context lost: {0}")]
    ContextLost(String),

    /// A call was made that the device cannot execute in its current state
    #[error("invalid device operation: {0}")]
    InvalidOperation(String),

    /// The device ran out of memory for a resource
    #[error("device out of memory: {0}")]
    OutOfMemory(String),
}

/// Handle to a texture resource stored on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// The reserved "no texture bound" handle
    pub const NONE: Self = Self(0);
}

/// Server-side pipeline capabilities that can be enabled or disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Backface culling
    CullFace,
    /// Alpha testing (discard fragments below a cutoff)
    AlphaTest,
    /// Depth testing
    DepthTest,
    /// Scissor testing
    ScissorTest,
    /// Per-vertex color tracks the material color
    ColorMaterial,
    /// 2D texturing
    Texture2d,
    /// Alpha blending
    Blend,
    /// Fixed-function lighting
    Lighting,
    /// Fixed-function fog
    Fog,
}

impl Capability {
    /// Number of capabilities in the closed enumeration
    pub const COUNT: usize = 9;

    /// Every capability, in cache-index order
    pub const ALL: [Self; Self::COUNT] = [
        Self::CullFace,
        Self::AlphaTest,
        Self::DepthTest,
        Self::ScissorTest,
        Self::ColorMaterial,
        Self::Texture2d,
        Self::Blend,
        Self::Lighting,
        Self::Fog,
    ];

    /// Index of this capability into the cache arrays
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Client-side vertex attribute arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientArray {
    /// Vertex positions
    Vertex,
    /// Vertex normals
    Normal,
    /// Per-vertex colors
    Color,
    /// Texture coordinates
    TexCoord,
}

impl ClientArray {
    /// Number of client arrays in the closed enumeration
    pub const COUNT: usize = 4;

    /// Every client array, in cache-index order
    pub const ALL: [Self; Self::COUNT] =
        [Self::Vertex, Self::Normal, Self::Color, Self::TexCoord];

    /// Index of this array into the cache arrays
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Blend functions the renderer selects between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Standard alpha-over blending (source alpha, one minus source alpha)
    #[default]
    Alpha,
    /// Additive blending (source alpha, one) used for glow effects
    Additive,
}

/// Which faces get culled when culling is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullWinding {
    /// Cull backfaces (the normal case)
    #[default]
    Back,
    /// Cull frontfaces, revealing backfaces
    Front,
}

bitflags! {
    /// Which framebuffer attachments a clear operation affects
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearMask: u32 {
        /// Clear the color buffer
        const COLOR = 1 << 0;
        /// Clear the depth buffer
        const DEPTH = 1 << 1;
    }
}

bitflags! {
    /// Sampling flags applied when a texture is created
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextureFlags: u32 {
        /// Clamp the U coordinate to the edge
        const CLAMP_U = 1 << 0;
        /// Clamp the V coordinate to the edge
        const CLAMP_V = 1 << 1;
        /// Clamp both coordinates to the edge
        const CLAMP_BOTH = Self::CLAMP_U.bits() | Self::CLAMP_V.bits();
    }
}

/// Pixel layout of texture data handed to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA, 4 bytes per pixel
    Rgba8,
    /// 8-bit RGB, 3 bytes per pixel
    Rgb8,
}

impl TextureFormat {
    /// Bytes occupied by one pixel in this format
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
        }
    }
}

/// A complete texture image upload
#[derive(Debug)]
pub struct TextureUpload<'a> {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Layout of `pixels`
    pub format: TextureFormat,
    /// Linear filtering if true, nearest otherwise
    pub filtered: bool,
    /// Sampling flags
    pub flags: TextureFlags,
    /// Tightly packed pixel rows, `width * height * bytes_per_pixel` bytes
    pub pixels: &'a [u8],
}

/// One indexed triangle draw
///
/// Slices borrow the caller's mesh data (or the renderer's scratch UVs) and
/// must stay valid for the duration of the call only; the device is
/// expected to consume them synchronously.
#[derive(Debug)]
pub struct TriangleDraw<'a> {
    /// Vertex positions
    pub positions: &'a [[f32; 3]],
    /// Vertex normals, if the geometry is lit
    pub normals: Option<&'a [[f32; 3]]>,
    /// Per-vertex colors, if the color array is in use
    pub colors: Option<&'a [[f32; 4]]>,
    /// Texture coordinates, if texturing is in use
    pub uvs: Option<&'a [[f32; 2]]>,
    /// Triangle index triples, flattened
    pub indices: &'a [u16],
}

impl TriangleDraw<'_> {
    /// Number of triangles this draw covers
    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }
}

/// Graphics device trait
///
/// This trait abstracts over the underlying graphics context and provides
/// the call surface the renderer core drives. Implementations must execute
/// calls synchronously in submission order.
pub trait GraphicsDevice {
    /// Enable or disable a pipeline capability
    fn set_capability(&mut self, capability: Capability, enabled: bool) -> DeviceResult<()>;

    /// Enable or disable a client vertex array
    fn set_client_array(&mut self, array: ClientArray, enabled: bool) -> DeviceResult<()>;

    /// Enable or disable depth-buffer writes
    fn set_depth_write(&mut self, enabled: bool) -> DeviceResult<()>;

    /// Select the blend function used while blending is enabled
    fn set_blend_mode(&mut self, mode: BlendMode) -> DeviceResult<()>;

    /// Select which faces are culled while culling is enabled
    fn set_cull_winding(&mut self, winding: CullWinding) -> DeviceResult<()>;

    /// Set the constant draw color applied to subsequent draws
    fn set_draw_color(&mut self, color: [f32; 4]) -> DeviceResult<()>;

    /// Set the color used by [`GraphicsDevice::clear`]
    fn set_clear_color(&mut self, color: [f32; 4]) -> DeviceResult<()>;

    /// Clear the selected framebuffer attachments
    fn clear(&mut self, mask: ClearMask) -> DeviceResult<()>;

    /// Set the viewport rectangle
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> DeviceResult<()>;

    /// Set the scissor rectangle (only observed while scissor testing is on)
    fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32) -> DeviceResult<()>;

    /// Create a texture from a complete image and return its handle
    ///
    /// The texture bind point is left untouched; callers bind the new
    /// texture explicitly (through the state cache) when they want it
    /// active.
    fn create_texture(&mut self, upload: &TextureUpload) -> DeviceResult<TextureHandle>;

    /// Replace a sub-region of an existing texture
    ///
    /// `pixels` holds tightly packed rows for the sub-region only.
    fn update_texture(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> DeviceResult<()>;

    /// Delete a texture
    fn delete_texture(&mut self, texture: TextureHandle) -> DeviceResult<()>;

    /// Bind a texture to the 2D texture unit
    fn bind_texture(&mut self, texture: TextureHandle) -> DeviceResult<()>;

    /// Push the model-view stack and multiply in a transform
    fn push_model_transform(&mut self, transform: &Mat4) -> DeviceResult<()>;

    /// Pop the model-view stack
    fn pop_model_transform(&mut self) -> DeviceResult<()>;

    /// Push both matrix stacks and install a screen-space orthographic
    /// projection with an identity model-view
    fn push_ortho_2d(&mut self) -> DeviceResult<()>;

    /// Pop both matrix stacks pushed by [`GraphicsDevice::push_ortho_2d`]
    fn pop_ortho_2d(&mut self) -> DeviceResult<()>;

    /// Draw indexed triangles from the supplied arrays
    fn draw_triangles(&mut self, draw: &TriangleDraw) -> DeviceResult<()>;

    /// Read back the framebuffer as tightly packed 8-bit RGB rows
    fn read_framebuffer_rgb(&mut self, width: u32, height: u32) -> DeviceResult<Vec<u8>>;

    /// Present the rendered frame to the display
    ///
    /// May block on vertical sync; the renderer treats this as an opaque
    /// external wait.
    fn present(&mut self) -> DeviceResult<()>;

    /// Downcast to the concrete device type
    ///
    /// Used by tests and diagnostics to reach implementation-specific
    /// inspection APIs (such as the trace device's call log).
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to the mutable concrete device type
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_indices_are_dense() {
        for (i, capability) in Capability::ALL.iter().enumerate() {
            assert_eq!(capability.index(), i);
        }
        for (i, array) in ClientArray::ALL.iter().enumerate() {
            assert_eq!(array.index(), i);
        }
    }

    #[test]
    fn test_clamp_both_covers_each_axis() {
        assert!(TextureFlags::CLAMP_BOTH.contains(TextureFlags::CLAMP_U));
        assert!(TextureFlags::CLAMP_BOTH.contains(TextureFlags::CLAMP_V));
    }

    #[test]
    fn test_triangle_count() {
        let draw = TriangleDraw {
            positions: &[[0.0; 3]; 3],
            normals: None,
            colors: None,
            uvs: None,
            indices: &[0, 1, 2, 0, 2, 1],
        };
        assert_eq!(draw.triangle_count(), 2);
    }
}
