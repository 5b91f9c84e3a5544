//! Core rendering primitives
//!
//! Data-only geometry and color types consumed by the renderer. Nothing in
//! here touches the graphics device.

pub mod mesh;

pub use mesh::{
    BoundingBox, ColorRgba, MeshLibrary, PixelFormat, Pixmap, PixmapData, TexturingMode, TriMesh,
};
