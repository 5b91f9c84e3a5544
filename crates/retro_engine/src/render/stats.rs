//! Per-frame rendering statistics
//!
//! Counters accumulated between frame start and frame end. Not required
//! for correctness, but they make the batching behavior observable: tests
//! and diagnostics read them to verify that redundant state changes are
//! actually being suppressed.

/// Statistics for the frame currently being built (or the last finished one)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Triangles submitted to the device this frame
    pub triangles_drawn: u32,

    /// Total queue entries flushed this frame (accumulates across
    /// mid-frame flushes)
    pub mesh_queue_size: u32,

    /// State transitions suppressed because the cache already held the
    /// requested value
    pub batched_state_changes: u32,

    /// Meshes drawn in the opaque pass
    pub meshes_drawn_opaque: u32,

    /// Meshes drawn in the transparent pass
    pub meshes_drawn_transparent: u32,

    /// Mesh draw calls issued during queue flush (a kept-backfaces
    /// transparent mesh counts twice)
    pub draw_calls: u32,
}

impl RenderStats {
    /// Reset every counter to zero
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
