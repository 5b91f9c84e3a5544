//! Mesh representation for the frame renderer
//!
//! Meshes are externally owned, plain data: the renderer reads them during
//! a frame but never mutates geometry. The only renderer-driven writes are
//! setup-time texture handle assignment performed by the texture manager
//! on a [`MeshLibrary`].

use crate::foundation::math::Point3;
use crate::render::api::TextureHandle;

/// RGBA color with unpremultiplied components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRgba {
    /// Red component
    pub r: f32,
    /// Green component
    pub g: f32,
    /// Blue component
    pub b: f32,
    /// Alpha component
    pub a: f32,
}

impl ColorRgba {
    /// Opaque white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Opaque black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create a color from components
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Component-wise multiply, used to combine mesh and modifier colors
    #[must_use]
    pub fn modulate(&self, other: &Self) -> Self {
        Self::new(
            self.r * other.r,
            self.g * other.g,
            self.b * other.b,
            self.a * other.a,
        )
    }

    /// The color as an array, in RGBA order
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for ColorRgba {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: [f32; 3],
    /// Maximum corner
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Compute the box enclosing a set of points
    ///
    /// An empty point set yields a degenerate box at the origin.
    #[must_use]
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for p in points {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        if points.is_empty() {
            return Self {
                min: [0.0; 3],
                max: [0.0; 3],
            };
        }
        Self { min, max }
    }

    /// Midpoint of the box
    #[must_use]
    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        )
    }
}

/// How a mesh samples its texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TexturingMode {
    /// No texturing
    #[default]
    Off,
    /// Fully opaque texture
    Opaque,
    /// Texture with 1-bit alpha, drawn with alpha testing
    AlphaTest,
    /// Texture with full alpha, drawn blended in the transparent pass
    AlphaBlend,
}

/// A triangle mesh record
///
/// Index triples reference the position/normal/color/UV arrays, which all
/// share one vertex ordering.
#[derive(Debug, Clone)]
pub struct TriMesh {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals
    pub normals: Vec<[f32; 3]>,
    /// Optional per-vertex colors
    pub vertex_colors: Option<Vec<[f32; 4]>>,
    /// Optional texture coordinates
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Triangle index triples, flattened (`3 * triangle_count` entries)
    pub indices: Vec<u16>,
    /// Bounding box around `positions`
    pub bounds: BoundingBox,
    /// Diffuse color applied to the whole mesh
    pub diffuse_color: ColorRgba,
    /// How the mesh is textured
    pub texturing_mode: TexturingMode,
    /// Device texture sampled when texturing is on
    pub texture: Option<TextureHandle>,
    /// Index into the owning [`MeshLibrary`]'s texture table, if any
    pub source_texture: Option<usize>,
}

impl TriMesh {
    /// Create a mesh from positions, normals, and flattened index triples
    ///
    /// # Panics
    /// Panics if `normals` does not match `positions` in length or the
    /// index count is not a multiple of three.
    #[must_use]
    pub fn new(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u16>) -> Self {
        assert_eq!(
            positions.len(),
            normals.len(),
            "positions and normals must share one vertex ordering"
        );
        assert_eq!(indices.len() % 3, 0, "indices must form whole triangles");
        let bounds = BoundingBox::from_points(&positions);
        Self {
            positions,
            normals,
            vertex_colors: None,
            uvs: None,
            indices,
            bounds,
            diffuse_color: ColorRgba::WHITE,
            texturing_mode: TexturingMode::Off,
            texture: None,
            source_texture: None,
        }
    }

    /// Attach texture coordinates
    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        assert_eq!(uvs.len(), self.positions.len());
        self.uvs = Some(uvs);
        self
    }

    /// Attach per-vertex colors
    #[must_use]
    pub fn with_vertex_colors(mut self, colors: Vec<[f32; 4]>) -> Self {
        assert_eq!(colors.len(), self.positions.len());
        self.vertex_colors = Some(colors);
        self
    }

    /// Set the mesh diffuse color
    #[must_use]
    pub fn with_diffuse_color(mut self, color: ColorRgba) -> Self {
        self.diffuse_color = color;
        self
    }

    /// Set the texturing mode and device texture together
    #[must_use]
    pub fn with_texture(mut self, mode: TexturingMode, texture: TextureHandle) -> Self {
        self.texturing_mode = mode;
        self.texture = Some(texture);
        self
    }

    /// Reference a texture in the owning library, resolved at upload time
    #[must_use]
    pub fn with_source_texture(mut self, index: usize) -> Self {
        self.source_texture = Some(index);
        self
    }

    /// Number of vertices
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles
    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }
}

/// Source pixel layouts a decoded texture may arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32-bit ARGB, 8 bits per channel
    Argb8888,
    /// 16-bit RGB, 5 bits per channel (top bit unused)
    Rgb555,
    /// 16-bit ARGB, 1-bit alpha and 5 bits per channel
    Argb1555,
    /// 8-bit palette indices; not uploadable without a palette
    Indexed8,
}

/// Decoded pixel storage, typed by element width
#[derive(Debug, Clone)]
pub enum PixmapData {
    /// One `u32` per pixel
    Packed32(Vec<u32>),
    /// One `u16` per pixel
    Packed16(Vec<u16>),
    /// One byte per pixel
    Packed8(Vec<u8>),
}

impl PixmapData {
    /// Number of pixels stored
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        match self {
            Self::Packed32(v) => v.len(),
            Self::Packed16(v) => v.len(),
            Self::Packed8(v) => v.len(),
        }
    }

    /// Raw storage bytes, regardless of element width
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Packed32(v) => bytemuck::cast_slice(v),
            Self::Packed16(v) => bytemuck::cast_slice(v),
            Self::Packed8(v) => v,
        }
    }
}

/// A decoded texture image awaiting upload
#[derive(Debug, Clone)]
pub struct Pixmap {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// Pixel storage
    pub data: PixmapData,
    /// Device texture once uploaded
    pub texture: Option<TextureHandle>,
}

impl Pixmap {
    /// Create a pixmap from decoded pixels
    #[must_use]
    pub fn new(width: u32, height: u32, format: PixelFormat, data: PixmapData) -> Self {
        Self {
            width,
            height,
            format,
            data,
            texture: None,
        }
    }
}

/// A decoded asset bundle: texture images plus the meshes that use them
///
/// Mirrors what a model-file loader produces. Meshes reference textures by
/// index through [`TriMesh::source_texture`]; the texture manager resolves
/// those to device handles at upload time.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    /// Texture images
    pub textures: Vec<Pixmap>,
    /// Mesh records
    pub meshes: Vec<TriMesh>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> TriMesh {
        TriMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0.0, 0.0, 1.0]; 3],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_bounds_center() {
        let bounds = BoundingBox::from_points(&[[-1.0, 0.0, 2.0], [3.0, 4.0, 6.0]]);
        let center = bounds.center();
        assert_eq!(center, Point3::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn test_mesh_counts() {
        let mesh = unit_triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    #[should_panic(expected = "whole triangles")]
    fn test_ragged_indices_rejected() {
        let _ = TriMesh::new(
            vec![[0.0; 3]; 3],
            vec![[0.0, 0.0, 1.0]; 3],
            vec![0, 1],
        );
    }

    #[test]
    fn test_color_modulate() {
        let combined = ColorRgba::new(1.0, 0.5, 1.0, 1.0).modulate(&ColorRgba::new(0.5, 0.5, 1.0, 0.25));
        assert_eq!(combined, ColorRgba::new(0.5, 0.25, 1.0, 0.25));
    }

    #[test]
    fn test_pixmap_data_bytes() {
        let data = PixmapData::Packed16(vec![0xffff, 0x0000]);
        assert_eq!(data.as_bytes().len(), 4);
        assert_eq!(data.pixel_count(), 2);
    }
}
