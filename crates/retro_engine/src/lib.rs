//! # Retro Engine
//!
//! A deferred-submission, state-caching rendering core modelled on the
//! fixed-function pipelines of late-90s 3D games, written as a
//! backend-agnostic library.
//!
//! ## Features
//!
//! - **Deferred Submission**: meshes queue up per frame and draw in one
//!   globally sorted flush
//! - **Two-Pass Transparency**: opaque front-to-back, transparent
//!   back-to-front, with priority overrides
//! - **State Caching**: redundant pipeline toggles and texture binds are
//!   suppressed and counted
//! - **Environment Mapping**: per-vertex reflection UVs computed on the CPU
//! - **2D Overlays**: cover images with aspect-ratio fitting and damage
//!   tracking, plus screen fades
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retro_engine::prelude::*;
//!
//! fn main() -> Result<(), RenderError> {
//!     let mut renderer =
//!         Renderer::new(Box::new(TraceDevice::new()), RendererConfig::default())?;
//!
//!     let mesh = TriMesh::new(
//!         vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!         vec![[0.0, 0.0, 1.0]; 3],
//!         vec![0, 1, 2],
//!     );
//!
//!     let mut frame = renderer.begin_frame()?;
//!     frame.submit_mesh(&mesh, None, None, None);
//!     frame.finish()?;
//!     renderer.present()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::config::{Config, ConfigError, RendererConfig};
    pub use crate::foundation::{
        logging,
        math::{Mat4, Point3, Vec2, Vec3},
    };
    pub use crate::render::{
        ColorRgba, CoverFit, Frame, GraphicsDevice, MeshLibrary, ModifierFlags, RenderError,
        RenderModifiers, RenderResult, RenderStats, Renderer, TexturingMode, TraceDevice, TriMesh,
    };
}
