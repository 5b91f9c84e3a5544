//! Mesh submission queue entries and depth sorting
//!
//! Each submission is turned into a [`QueueEntry`] carrying borrowed mesh
//! data and a depth-sort key computed immediately, so the flush can order
//! the whole frame globally without re-reading geometry.

use std::cmp::Ordering;

use crate::foundation::math::{Mat4, Point3};
use crate::render::primitives::{ColorRgba, TriMesh};
use bitflags::bitflags;

bitflags! {
    /// Capability flags a caller attaches to a submission
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModifierFlags: u32 {
        /// Replace the mesh UVs with computed reflection coordinates
        const REFLECTION_MAP = 1 << 0;
        /// Draw with additive blending (forces the transparent pass)
        const GLOW = 1 << 1;
        /// Suppress depth-buffer writes for this submission
        const NO_Z_WRITE = 1 << 2;
        /// Keep backfaces instead of culling them
        const KEEP_BACKFACES = 1 << 3;
        /// Disable lighting for this submission
        const NULL_SHADER = 1 << 4;
    }
}

/// Per-submission render modifiers
///
/// Owned by the caller and borrowed by the queue for the duration of one
/// frame; the renderer never copies or mutates them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderModifiers {
    /// Capability flags
    pub flags: ModifierFlags,
    /// Diffuse color multiplied into every mesh color of the submission
    pub diffuse_color: ColorRgba,
    /// Explicit draw-order override; lower values draw first regardless of
    /// depth
    pub sort_priority: i32,
}

impl RenderModifiers {
    /// No flags, white diffuse, neutral priority
    pub const DEFAULT: Self = Self {
        flags: ModifierFlags::empty(),
        diffuse_color: ColorRgba::WHITE,
        sort_priority: 0,
    };
}

impl Default for RenderModifiers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The meshes referenced by one queue entry
#[derive(Debug, Clone, Copy)]
pub(crate) enum MeshRef<'scene> {
    /// A single mesh record
    Single(&'scene TriMesh),
    /// An ordered group of mesh records drawn under one transform
    List(&'scene [TriMesh]),
}

impl<'scene> MeshRef<'scene> {
    pub(crate) fn iter(&self) -> std::slice::Iter<'scene, TriMesh> {
        match self {
            Self::Single(mesh) => std::slice::from_ref(*mesh).iter(),
            Self::List(meshes) => meshes.iter(),
        }
    }
}

/// A deferred draw request, valid only within the current frame
#[derive(Debug)]
pub(crate) struct QueueEntry<'scene> {
    pub(crate) meshes: MeshRef<'scene>,
    pub(crate) transform: Option<&'scene Mat4>,
    pub(crate) mods: Option<&'scene RenderModifiers>,
    pub(crate) depth_sort_z: f32,
}

impl QueueEntry<'_> {
    /// The entry's modifiers, or the defaults when none were supplied
    pub(crate) fn mods(&self) -> &RenderModifiers {
        self.mods.unwrap_or(&RenderModifiers::DEFAULT)
    }

    /// Draw-order comparator: ascending `(sort_priority, depth_sort_z)`
    ///
    /// Used with a stable sort, so entries with equal priority and equal
    /// depth keep their submission order. That tie-break is deliberate and
    /// tests rely on it.
    pub(crate) fn compare(a: &Self, b: &Self) -> Ordering {
        a.mods()
            .sort_priority
            .cmp(&b.mods().sort_priority)
            .then_with(|| a.depth_sort_z.total_cmp(&b.depth_sort_z))
    }
}

/// Compute a submission's depth-sort key
///
/// Transforms the caller's center hint (or the averaged midpoint of the
/// meshes' bounding boxes) into view-frustum space and takes its depth
/// component.
pub(crate) fn depth_sort_z(
    meshes: &MeshRef<'_>,
    center_hint: Option<Point3>,
    world_to_frustum: &Mat4,
) -> f32 {
    let center = center_hint.unwrap_or_else(|| {
        let mut sum = Point3::origin();
        let mut count = 0u32;
        for mesh in meshes.iter() {
            let c = mesh.bounds.center();
            sum.x += c.x;
            sum.y += c.y;
            sum.z += c.z;
            count += 1;
        }
        if count > 0 {
            let inv = 1.0 / count as f32;
            Point3::new(sum.x * inv, sum.y * inv, sum.z * inv)
        } else {
            sum
        }
    });

    world_to_frustum.transform_point(&center).z
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mesh_at(z: f32) -> TriMesh {
        TriMesh::new(
            vec![[0.0, 0.0, z - 1.0], [1.0, 0.0, z + 1.0], [0.0, 1.0, z]],
            vec![[0.0, 0.0, 1.0]; 3],
            vec![0, 1, 2],
        )
    }

    fn entry_with(priority: i32, depth: f32, mods: &RenderModifiers) -> (RenderModifiers, f32) {
        let mut m = *mods;
        m.sort_priority = priority;
        (m, depth)
    }

    #[test]
    fn test_depth_key_uses_center_hint() {
        let mesh = mesh_at(0.0);
        let meshes = MeshRef::Single(&mesh);
        let z = depth_sort_z(&meshes, Some(Point3::new(0.0, 0.0, 42.0)), &Mat4::identity());
        assert_relative_eq!(z, 42.0, epsilon = 1e-6);
    }

    #[test]
    fn test_depth_key_averages_bounds_midpoints() {
        let meshes = vec![mesh_at(10.0), mesh_at(20.0)];
        let z = depth_sort_z(&MeshRef::List(&meshes), None, &Mat4::identity());
        assert_relative_eq!(z, 15.0, epsilon = 1e-6);
    }

    #[test]
    fn test_depth_key_respects_frustum_transform() {
        let mesh = mesh_at(0.0);
        // Translate the view so the representative point lands deeper
        let world_to_frustum = Mat4::new_translation(&crate::foundation::math::Vec3::new(0.0, 0.0, 5.0));
        let z = depth_sort_z(
            &MeshRef::Single(&mesh),
            Some(Point3::new(0.0, 0.0, 1.0)),
            &world_to_frustum,
        );
        assert_relative_eq!(z, 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_priority_dominates_depth() {
        let mesh = mesh_at(0.0);
        let (near_mods, near_z) = entry_with(1, 1.0, &RenderModifiers::DEFAULT);
        let (far_mods, far_z) = entry_with(0, 100.0, &RenderModifiers::DEFAULT);

        let near = QueueEntry {
            meshes: MeshRef::Single(&mesh),
            transform: None,
            mods: Some(&near_mods),
            depth_sort_z: near_z,
        };
        let far = QueueEntry {
            meshes: MeshRef::Single(&mesh),
            transform: None,
            mods: Some(&far_mods),
            depth_sort_z: far_z,
        };

        // The far entry has lower priority, so it sorts first
        assert_eq!(QueueEntry::compare(&far, &near), Ordering::Less);
    }

    #[test]
    fn test_equal_priority_sorts_by_depth() {
        let mesh = mesh_at(0.0);
        let near = QueueEntry {
            meshes: MeshRef::Single(&mesh),
            transform: None,
            mods: None,
            depth_sort_z: 2.0,
        };
        let far = QueueEntry {
            meshes: MeshRef::Single(&mesh),
            transform: None,
            mods: None,
            depth_sort_z: 8.0,
        };
        assert_eq!(QueueEntry::compare(&near, &far), Ordering::Less);
        assert_eq!(QueueEntry::compare(&far, &near), Ordering::Greater);
    }

    #[test]
    fn test_equal_keys_compare_equal() {
        // Stable sort turns Ordering::Equal into submission order
        let mesh = mesh_at(0.0);
        let a = QueueEntry {
            meshes: MeshRef::Single(&mesh),
            transform: None,
            mods: None,
            depth_sort_z: 3.0,
        };
        let b = QueueEntry {
            meshes: MeshRef::Single(&mesh),
            transform: None,
            mods: None,
            depth_sort_z: 3.0,
        };
        assert_eq!(QueueEntry::compare(&a, &b), Ordering::Equal);
    }
}
