//! Headless tracing device
//!
//! A [`GraphicsDevice`] implementation that executes nothing but records
//! every call it receives. It backs the renderer's test suite (state-cache
//! idempotence, pass ordering, draw counts) and lets demos run without a
//! window or GPU.

use super::device::{
    BlendMode, Capability, ClearMask, ClientArray, CullWinding, DeviceResult, GraphicsDevice,
    TextureHandle, TextureUpload, TriangleDraw,
};
use crate::foundation::math::Mat4;

/// One recorded device call
///
/// Draw calls record enough shape information (triangle count, which
/// arrays were supplied, the active draw color) for tests to reconstruct
/// ordering without holding borrows into caller geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// `set_capability`
    SetCapability(Capability, bool),
    /// `set_client_array`
    SetClientArray(ClientArray, bool),
    /// `set_depth_write`
    SetDepthWrite(bool),
    /// `set_blend_mode`
    SetBlendMode(BlendMode),
    /// `set_cull_winding`
    SetCullWinding(CullWinding),
    /// `set_draw_color`
    SetDrawColor([f32; 4]),
    /// `set_clear_color`
    SetClearColor([f32; 4]),
    /// `clear`
    Clear(ClearMask),
    /// `set_viewport`
    SetViewport(i32, i32, u32, u32),
    /// `set_scissor`
    SetScissor(i32, i32, u32, u32),
    /// `create_texture`
    CreateTexture {
        /// Handle assigned to the new texture
        texture: TextureHandle,
        /// Image width in pixels
        width: u32,
        /// Image height in pixels
        height: u32,
    },
    /// `update_texture`
    UpdateTexture {
        /// Target texture
        texture: TextureHandle,
        /// Sub-region origin X
        x: u32,
        /// Sub-region origin Y
        y: u32,
        /// Sub-region width
        width: u32,
        /// Sub-region height
        height: u32,
    },
    /// `delete_texture`
    DeleteTexture(TextureHandle),
    /// `bind_texture`
    BindTexture(TextureHandle),
    /// `push_model_transform`
    PushModelTransform,
    /// `pop_model_transform`
    PopModelTransform,
    /// `push_ortho_2d`
    PushOrtho2d,
    /// `pop_ortho_2d`
    PopOrtho2d,
    /// `draw_triangles`
    DrawTriangles {
        /// Number of triangles in the draw
        triangles: u32,
        /// Draw color active at the time of the call
        color: [f32; 4],
        /// Whether texture coordinates were supplied
        textured: bool,
    },
    /// `read_framebuffer_rgb`
    ReadFramebuffer,
    /// `present`
    Present,
}

/// Recording graphics device with no real backend
#[derive(Debug)]
pub struct TraceDevice {
    calls: Vec<DeviceCall>,
    next_texture: u32,
    live_textures: u32,
    draw_color: [f32; 4],
}

impl Default for TraceDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceDevice {
    /// Create an empty trace device
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_texture: 0,
            live_textures: 0,
            draw_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// All recorded calls, in issue order
    #[must_use]
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Discard the recorded call log (texture bookkeeping is kept)
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Draw colors of every recorded triangle draw, in issue order
    #[must_use]
    pub fn draw_colors(&self) -> Vec<[f32; 4]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::DrawTriangles { color, .. } => Some(*color),
                _ => None,
            })
            .collect()
    }

    /// Number of textures created and not yet deleted
    #[must_use]
    pub fn live_texture_count(&self) -> u32 {
        self.live_textures
    }
}

impl GraphicsDevice for TraceDevice {
    fn set_capability(&mut self, capability: Capability, enabled: bool) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetCapability(capability, enabled));
        Ok(())
    }

    fn set_client_array(&mut self, array: ClientArray, enabled: bool) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetClientArray(array, enabled));
        Ok(())
    }

    fn set_depth_write(&mut self, enabled: bool) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetDepthWrite(enabled));
        Ok(())
    }

    fn set_blend_mode(&mut self, mode: BlendMode) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetBlendMode(mode));
        Ok(())
    }

    fn set_cull_winding(&mut self, winding: CullWinding) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetCullWinding(winding));
        Ok(())
    }

    fn set_draw_color(&mut self, color: [f32; 4]) -> DeviceResult<()> {
        self.draw_color = color;
        self.calls.push(DeviceCall::SetDrawColor(color));
        Ok(())
    }

    fn set_clear_color(&mut self, color: [f32; 4]) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetClearColor(color));
        Ok(())
    }

    fn clear(&mut self, mask: ClearMask) -> DeviceResult<()> {
        self.calls.push(DeviceCall::Clear(mask));
        Ok(())
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetViewport(x, y, width, height));
        Ok(())
    }

    fn set_scissor(&mut self, x: i32, y: i32, width: u32, height: u32) -> DeviceResult<()> {
        self.calls.push(DeviceCall::SetScissor(x, y, width, height));
        Ok(())
    }

    fn create_texture(&mut self, upload: &TextureUpload) -> DeviceResult<TextureHandle> {
        // Handle 0 is reserved for "no texture"
        self.next_texture += 1;
        self.live_textures += 1;
        let texture = TextureHandle(self.next_texture);
        self.calls.push(DeviceCall::CreateTexture {
            texture,
            width: upload.width,
            height: upload.height,
        });
        Ok(texture)
    }

    fn update_texture(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        _pixels: &[u8],
    ) -> DeviceResult<()> {
        self.calls.push(DeviceCall::UpdateTexture {
            texture,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) -> DeviceResult<()> {
        self.live_textures = self.live_textures.saturating_sub(1);
        self.calls.push(DeviceCall::DeleteTexture(texture));
        Ok(())
    }

    fn bind_texture(&mut self, texture: TextureHandle) -> DeviceResult<()> {
        self.calls.push(DeviceCall::BindTexture(texture));
        Ok(())
    }

    fn push_model_transform(&mut self, _transform: &Mat4) -> DeviceResult<()> {
        self.calls.push(DeviceCall::PushModelTransform);
        Ok(())
    }

    fn pop_model_transform(&mut self) -> DeviceResult<()> {
        self.calls.push(DeviceCall::PopModelTransform);
        Ok(())
    }

    fn push_ortho_2d(&mut self) -> DeviceResult<()> {
        self.calls.push(DeviceCall::PushOrtho2d);
        Ok(())
    }

    fn pop_ortho_2d(&mut self) -> DeviceResult<()> {
        self.calls.push(DeviceCall::PopOrtho2d);
        Ok(())
    }

    fn draw_triangles(&mut self, draw: &TriangleDraw) -> DeviceResult<()> {
        self.calls.push(DeviceCall::DrawTriangles {
            triangles: draw.triangle_count(),
            color: self.draw_color,
            textured: draw.uvs.is_some(),
        });
        Ok(())
    }

    fn read_framebuffer_rgb(&mut self, width: u32, height: u32) -> DeviceResult<Vec<u8>> {
        self.calls.push(DeviceCall::ReadFramebuffer);
        Ok(vec![0; width as usize * height as usize * 3])
    }

    fn present(&mut self) -> DeviceResult<()> {
        self.calls.push(DeviceCall::Present);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::device::{TextureFlags, TextureFormat};

    #[test]
    fn test_texture_handles_start_at_one() {
        let mut device = TraceDevice::new();
        let upload = TextureUpload {
            width: 2,
            height: 2,
            format: TextureFormat::Rgba8,
            filtered: true,
            flags: TextureFlags::empty(),
            pixels: &[0; 16],
        };
        let handle = device.create_texture(&upload).unwrap();
        assert_eq!(handle, TextureHandle(1));
        assert_ne!(handle, TextureHandle::NONE);
        assert_eq!(device.live_texture_count(), 1);
    }

    #[test]
    fn test_draws_record_active_color() {
        let mut device = TraceDevice::new();
        device.set_draw_color([0.5, 0.0, 0.0, 1.0]).unwrap();
        device
            .draw_triangles(&TriangleDraw {
                positions: &[[0.0; 3]; 3],
                normals: None,
                colors: None,
                uvs: None,
                indices: &[0, 1, 2],
            })
            .unwrap();
        assert_eq!(device.draw_colors(), vec![[0.5, 0.0, 0.0, 1.0]]);
    }
}
