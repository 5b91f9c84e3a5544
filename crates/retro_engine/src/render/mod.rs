//! # Rendering System
//!
//! The core frame renderer: a deferred-submission, state-caching pipeline
//! that batches mesh groups per frame, depth-sorts them, and draws them in
//! two passes (opaque front-to-back, transparent back-to-front) while
//! suppressing redundant pipeline state transitions.
//!
//! ## Architecture
//!
//! - [`Renderer`]: the single context object owning the device, the state
//!   cache, the environment-map scratch buffer, the 2D overlay, and the
//!   frame statistics
//! - [`Frame`]: the open submission window; holds the per-frame queue
//! - [`api::GraphicsDevice`]: the backend seam; [`api::TraceDevice`] runs
//!   it headlessly
//! - [`state::StateCache`]: deduplicates toggle/bind calls
//!
//! ## Frame lifecycle
//!
//! ```rust
//! use retro_engine::config::RendererConfig;
//! use retro_engine::render::api::TraceDevice;
//! use retro_engine::render::{Renderer, TriMesh};
//!
//! # fn main() -> Result<(), retro_engine::render::RenderError> {
//! let mut renderer = Renderer::new(Box::new(TraceDevice::new()), RendererConfig::default())?;
//! let mesh = TriMesh::new(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     vec![[0.0, 0.0, 1.0]; 3],
//!     vec![0, 1, 2],
//! );
//!
//! let mut frame = renderer.begin_frame()?;
//! frame.submit_mesh(&mesh, None, None, None);
//! frame.finish()?;
//! # Ok(())
//! # }
//! ```

pub mod api;
mod env_map;
pub mod frame;
pub mod overlay;
pub mod primitives;
pub mod queue;
pub mod state;
pub mod stats;
mod texture;


pub use api::{
    BlendMode, Capability, ClearMask, ClientArray, CullWinding, DeviceError, GraphicsDevice,
    TextureFlags, TextureFormat, TextureHandle, TraceDevice,
};
pub use frame::Frame;
pub use overlay::{CoverFit, PaneInsets, PixelRect, ViewportRect};
pub use primitives::{
    BoundingBox, ColorRgba, MeshLibrary, PixelFormat, Pixmap, PixmapData, TexturingMode, TriMesh,
};
pub use queue::{ModifierFlags, RenderModifiers};
pub use state::{StateCache, StateSnapshot};
pub use stats::RenderStats;

use crate::config::RendererConfig;
use crate::foundation::math::{Mat4, Point3};
use overlay::CoverOverlay;
use thiserror::Error;

/// Rendering error types
///
/// A device failure means the graphics context is corrupt or lost; there
/// is no retry logic anywhere in the renderer, so callers should treat
/// these as unrecoverable and shut the rendering subsystem down.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The underlying graphics device reported a failure
    #[error("graphics device error: {0}")]
    Device(#[from] DeviceError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// # Frame Renderer
///
/// The single context object for the rendering subsystem. Owns the
/// graphics device and every piece of per-frame machinery: the state
/// cache, the environment-map scratch buffer, the 2D overlay, and the
/// statistics counters.
///
/// All operations run on the thread owning the graphics context; the
/// renderer has no internal concurrency and needs none, because the frame
/// lifecycle is strictly sequential: [`Renderer::begin_frame`] opens a
/// [`Frame`], submissions queue up, and [`Frame::finish`] drains the queue
/// before the next frame can open.
pub struct Renderer {
    /// Backend abstraction executing the actual graphics calls
    pub(crate) device: Box<dyn GraphicsDevice>,

    /// Mirror of the device's toggle/bind state
    pub(crate) state: StateCache,

    /// Counters for the frame being built
    pub(crate) stats: RenderStats,

    /// Tunables fixed at construction
    pub(crate) config: RendererConfig,

    /// World-to-frustum transform used for depth-sort keys
    pub(crate) world_to_frustum: Mat4,

    /// Viewer reference point for environment mapping
    pub(crate) viewer_position: Point3,

    /// Reflection UV scratch, reused by every environment-mapped mesh
    pub(crate) env_map_uvs: Vec<[f32; 2]>,

    /// Current window pixel dimensions
    pub(crate) window_size: (u32, u32),

    /// Fade overlay opacity; drawn at frame end when above the visible
    /// threshold
    pub(crate) fade_opacity: f32,

    /// The full-screen cover image, when allocated
    pub(crate) cover: Option<CoverOverlay>,

    /// Saved 3D state while 2D overlay mode is active
    pub(crate) snapshot_2d: Option<StateSnapshot>,
}

impl Renderer {
    /// Create a renderer over a device and seed the initial pipeline state
    ///
    /// Every toggle is issued unconditionally once so the cache and the
    /// device agree from the start.
    pub fn new(device: Box<dyn GraphicsDevice>, config: RendererConfig) -> RenderResult<Self> {
        let mut renderer = Self {
            device,
            state: StateCache::new(),
            stats: RenderStats::default(),
            env_map_uvs: Vec::with_capacity(config.max_env_map_vertices),
            config,
            world_to_frustum: Mat4::identity(),
            viewer_position: Point3::origin(),
            window_size: (640, 480),
            fade_opacity: 0.0,
            cover: None,
            snapshot_2d: None,
        };
        renderer.init_state()?;
        Ok(renderer)
    }

    /// Seed the device and cache with the canonical initial state
    fn init_state(&mut self) -> RenderResult<()> {
        let device = self.device.as_mut();

        self.state
            .set_initial_client_array(device, ClientArray::Vertex, true)?;
        self.state
            .set_initial_client_array(device, ClientArray::Normal, true)?;
        self.state
            .set_initial_client_array(device, ClientArray::Color, false)?;
        self.state
            .set_initial_client_array(device, ClientArray::TexCoord, true)?;

        self.state
            .set_initial_capability(device, Capability::CullFace, true)?;
        self.state
            .set_initial_capability(device, Capability::AlphaTest, true)?;
        self.state
            .set_initial_capability(device, Capability::DepthTest, true)?;
        self.state
            .set_initial_capability(device, Capability::ScissorTest, false)?;
        self.state
            .set_initial_capability(device, Capability::ColorMaterial, true)?;
        self.state
            .set_initial_capability(device, Capability::Texture2d, false)?;
        self.state
            .set_initial_capability(device, Capability::Blend, false)?;
        self.state
            .set_initial_capability(device, Capability::Lighting, true)?;
        self.state
            .set_initial_capability(device, Capability::Fog, false)?;

        self.state.set_initial_blend_mode(device, BlendMode::Alpha)?;
        self.state.set_initial_depth_write(device, true)?;

        device.set_clear_color(self.config.clear_color)?;

        log::info!(
            "renderer initialized: {} queue slots, {} env-map vertices",
            self.config.max_queue_size,
            self.config.max_env_map_vertices
        );
        Ok(())
    }

    /// Open a new frame
    ///
    /// Resets the statistics, re-enables depth writes so the depth buffer
    /// can be cleared, and clears the color and depth buffers. The
    /// returned [`Frame`] mutably borrows the renderer, so only one frame
    /// can be open at a time and submissions outside it cannot compile.
    pub fn begin_frame(&mut self) -> RenderResult<Frame<'_>> {
        self.stats.reset();

        // The depth mask must be on again before the depth clear can land
        self.state
            .set_depth_write(self.device.as_mut(), &mut self.stats, true)?;
        self.device.clear(ClearMask::COLOR | ClearMask::DEPTH)?;

        Ok(Frame::new(self))
    }

    /// Set the world-to-frustum transform used for submission sort keys
    ///
    /// Consumed read-only once per submission; typically updated whenever
    /// the camera moves.
    pub fn set_world_to_frustum(&mut self, transform: Mat4) {
        self.world_to_frustum = transform;
    }

    /// Set the viewer reference point used by environment mapping
    pub fn set_viewer_position(&mut self, position: Point3) {
        self.viewer_position = position;
    }

    /// Record the current window pixel dimensions
    ///
    /// Read each frame for viewport and aspect-ratio computations; the
    /// windowing collaborator calls this on resize.
    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    /// Current window pixel dimensions
    #[must_use]
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    /// Statistics for the frame being built (or the last finished frame)
    #[must_use]
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// The renderer's configuration
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// The cached pipeline state
    #[must_use]
    pub fn state(&self) -> &StateCache {
        &self.state
    }

    /// The underlying graphics device
    #[must_use]
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// Present the rendered frame to the display
    pub fn present(&mut self) -> RenderResult<()> {
        self.device.present()?;
        Ok(())
    }
}
