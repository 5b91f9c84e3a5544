//! Graphics state cache
//!
//! Mirrors the enable/disable and bind status of the underlying graphics
//! device and suppresses redundant calls. Every mutation compares the
//! requested value against the cached one: if unchanged it is a no-op
//! (counted in [`RenderStats::batched_state_changes`]), otherwise the
//! device call is issued and the cache updated.
//!
//! The cache is keyed by the closed [`Capability`] and [`ClientArray`]
//! enumerations, so a toggle cannot exist on the device without a cache
//! slot backing it.

use crate::render::api::{
    BlendMode, Capability, ClientArray, GraphicsDevice, TextureHandle,
};
use crate::render::stats::RenderStats;
use crate::render::RenderResult;

/// Cached device state: capability toggles, client arrays, depth-write
/// flag, blend function, and the bound texture
#[derive(Debug, Clone)]
pub struct StateCache {
    capabilities: [bool; Capability::COUNT],
    client_arrays: [bool; ClientArray::COUNT],
    depth_write: bool,
    blend_mode: BlendMode,
    bound_texture: TextureHandle,
}

/// A saved copy of the full cached state
///
/// Taken when entering a nested drawing mode (the 2D overlay) and replayed
/// on exit; the replay only issues device calls for actual deltas.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    state: StateCache,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCache {
    /// Create a cache with everything disabled and nothing bound
    ///
    /// The cache is only meaningful once seeded through the
    /// `set_initial_*` operations at context creation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: [false; Capability::COUNT],
            client_arrays: [false; ClientArray::COUNT],
            depth_write: false,
            blend_mode: BlendMode::Alpha,
            bound_texture: TextureHandle::NONE,
        }
    }

    // --- initial seeding (unconditional, context creation only) ---

    /// Unconditionally issue a capability change and seed the cache
    pub fn set_initial_capability(
        &mut self,
        device: &mut dyn GraphicsDevice,
        capability: Capability,
        enabled: bool,
    ) -> RenderResult<()> {
        device.set_capability(capability, enabled)?;
        self.capabilities[capability.index()] = enabled;
        Ok(())
    }

    /// Unconditionally issue a client array change and seed the cache
    pub fn set_initial_client_array(
        &mut self,
        device: &mut dyn GraphicsDevice,
        array: ClientArray,
        enabled: bool,
    ) -> RenderResult<()> {
        device.set_client_array(array, enabled)?;
        self.client_arrays[array.index()] = enabled;
        Ok(())
    }

    /// Unconditionally issue a depth-write change and seed the cache
    pub fn set_initial_depth_write(
        &mut self,
        device: &mut dyn GraphicsDevice,
        enabled: bool,
    ) -> RenderResult<()> {
        device.set_depth_write(enabled)?;
        self.depth_write = enabled;
        Ok(())
    }

    /// Unconditionally issue a blend mode change and seed the cache
    pub fn set_initial_blend_mode(
        &mut self,
        device: &mut dyn GraphicsDevice,
        mode: BlendMode,
    ) -> RenderResult<()> {
        device.set_blend_mode(mode)?;
        self.blend_mode = mode;
        Ok(())
    }

    // --- cached mutations ---

    /// Ensure a capability is in the requested state
    pub fn set_capability(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stats: &mut RenderStats,
        capability: Capability,
        enabled: bool,
    ) -> RenderResult<()> {
        if self.capabilities[capability.index()] == enabled {
            stats.batched_state_changes += 1;
            return Ok(());
        }
        device.set_capability(capability, enabled)?;
        self.capabilities[capability.index()] = enabled;
        Ok(())
    }

    /// Ensure a client array is in the requested state
    pub fn set_client_array(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stats: &mut RenderStats,
        array: ClientArray,
        enabled: bool,
    ) -> RenderResult<()> {
        if self.client_arrays[array.index()] == enabled {
            stats.batched_state_changes += 1;
            return Ok(());
        }
        device.set_client_array(array, enabled)?;
        self.client_arrays[array.index()] = enabled;
        Ok(())
    }

    /// Ensure depth-buffer writes are in the requested state
    pub fn set_depth_write(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stats: &mut RenderStats,
        enabled: bool,
    ) -> RenderResult<()> {
        if self.depth_write == enabled {
            stats.batched_state_changes += 1;
            return Ok(());
        }
        device.set_depth_write(enabled)?;
        self.depth_write = enabled;
        Ok(())
    }

    /// Ensure the blend function matches the requested mode
    pub fn set_blend_mode(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stats: &mut RenderStats,
        mode: BlendMode,
    ) -> RenderResult<()> {
        if self.blend_mode == mode {
            stats.batched_state_changes += 1;
            return Ok(());
        }
        device.set_blend_mode(mode)?;
        self.blend_mode = mode;
        Ok(())
    }

    /// Ensure a texture is bound to the 2D texture unit
    pub fn bind_texture(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stats: &mut RenderStats,
        texture: TextureHandle,
    ) -> RenderResult<()> {
        if self.bound_texture == texture {
            stats.batched_state_changes += 1;
            return Ok(());
        }
        device.bind_texture(texture)?;
        self.bound_texture = texture;
        Ok(())
    }

    /// Forget the cached binding for a texture that was just deleted
    ///
    /// Keeps the cache from treating a future bind of a recycled handle as
    /// redundant.
    pub fn invalidate_texture(&mut self, texture: TextureHandle) {
        if self.bound_texture == texture {
            self.bound_texture = TextureHandle::NONE;
        }
    }

    // --- snapshot / restore ---

    /// Capture the current cached state
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state: self.clone(),
        }
    }

    /// Replay a snapshot, issuing device calls only for the deltas
    pub fn restore(
        &mut self,
        device: &mut dyn GraphicsDevice,
        stats: &mut RenderStats,
        snapshot: &StateSnapshot,
    ) -> RenderResult<()> {
        for capability in Capability::ALL {
            self.set_capability(
                device,
                stats,
                capability,
                snapshot.state.capabilities[capability.index()],
            )?;
        }
        for array in ClientArray::ALL {
            self.set_client_array(
                device,
                stats,
                array,
                snapshot.state.client_arrays[array.index()],
            )?;
        }
        self.set_depth_write(device, stats, snapshot.state.depth_write)?;
        self.set_blend_mode(device, stats, snapshot.state.blend_mode)?;
        self.bind_texture(device, stats, snapshot.state.bound_texture)?;
        Ok(())
    }

    // --- accessors ---

    /// Cached state of a capability
    #[must_use]
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities[capability.index()]
    }

    /// Cached state of a client array
    #[must_use]
    pub fn client_array_enabled(&self, array: ClientArray) -> bool {
        self.client_arrays[array.index()]
    }

    /// Cached depth-write flag
    #[must_use]
    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// Cached blend mode
    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Cached texture binding
    #[must_use]
    pub fn bound_texture(&self) -> TextureHandle {
        self.bound_texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{DeviceCall, TraceDevice};

    fn harness() -> (StateCache, TraceDevice, RenderStats) {
        (StateCache::new(), TraceDevice::new(), RenderStats::default())
    }

    #[test]
    fn test_redundant_enable_is_batched() {
        let (mut cache, mut device, mut stats) = harness();

        cache
            .set_capability(&mut device, &mut stats, Capability::Blend, true)
            .unwrap();
        cache
            .set_capability(&mut device, &mut stats, Capability::Blend, true)
            .unwrap();

        let issued = device.count_calls(|c| matches!(c, DeviceCall::SetCapability(..)));
        assert_eq!(issued, 1);
        assert_eq!(stats.batched_state_changes, 1);
    }

    #[test]
    fn test_enable_then_disable_issues_two_calls() {
        let (mut cache, mut device, mut stats) = harness();

        cache
            .set_capability(&mut device, &mut stats, Capability::Blend, true)
            .unwrap();
        cache
            .set_capability(&mut device, &mut stats, Capability::Blend, false)
            .unwrap();

        let issued = device.count_calls(|c| matches!(c, DeviceCall::SetCapability(..)));
        assert_eq!(issued, 2);
        assert_eq!(stats.batched_state_changes, 0);
    }

    #[test]
    fn test_redundant_bind_is_batched() {
        let (mut cache, mut device, mut stats) = harness();
        let texture = TextureHandle(7);

        cache.bind_texture(&mut device, &mut stats, texture).unwrap();
        cache.bind_texture(&mut device, &mut stats, texture).unwrap();

        let issued = device.count_calls(|c| matches!(c, DeviceCall::BindTexture(_)));
        assert_eq!(issued, 1);
        assert_eq!(stats.batched_state_changes, 1);
    }

    #[test]
    fn test_restore_replays_only_deltas() {
        let (mut cache, mut device, mut stats) = harness();

        let snapshot = cache.snapshot();

        // Two changes since the snapshot; restoring should cost exactly two
        // device calls and batch everything else.
        cache
            .set_capability(&mut device, &mut stats, Capability::Lighting, true)
            .unwrap();
        cache
            .set_client_array(&mut device, &mut stats, ClientArray::Color, true)
            .unwrap();
        device.clear_calls();

        cache.restore(&mut device, &mut stats, &snapshot).unwrap();

        assert_eq!(device.calls().len(), 2);
        assert!(!cache.is_enabled(Capability::Lighting));
        assert!(!cache.client_array_enabled(ClientArray::Color));
    }

    #[test]
    fn test_initial_seed_is_unconditional() {
        let (mut cache, mut device, stats) = harness();

        // Seeding with the value the cache already holds must still issue
        cache
            .set_initial_capability(&mut device, Capability::DepthTest, false)
            .unwrap();
        assert_eq!(
            device.count_calls(|c| matches!(c, DeviceCall::SetCapability(..))),
            1
        );
        assert_eq!(stats.batched_state_changes, 0);
    }

    #[test]
    fn test_invalidate_texture_forces_rebind() {
        let (mut cache, mut device, mut stats) = harness();
        let texture = TextureHandle(3);

        cache.bind_texture(&mut device, &mut stats, texture).unwrap();
        cache.invalidate_texture(texture);
        cache.bind_texture(&mut device, &mut stats, texture).unwrap();

        let issued = device.count_calls(|c| matches!(c, DeviceCall::BindTexture(_)));
        assert_eq!(issued, 2);
    }
}
