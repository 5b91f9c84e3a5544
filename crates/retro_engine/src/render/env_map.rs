//! Environment-map texture coordinate generation
//!
//! Computes per-vertex reflection UVs for a mesh so a texture can stand in
//! for a mirrored environment. Coordinates land in a shared scratch buffer
//! that the draw call consumes immediately; the buffer is overwritten by
//! the next environment-mapped mesh.

use crate::foundation::math::{inverse_transpose, Mat4, Point3, Vec3};
use crate::render::primitives::TriMesh;

/// Fill `out` with reflection UVs for every vertex of `mesh`
///
/// Per vertex: the normal is carried through the inverse-transpose of the
/// world transform and normalized; the eye vector runs from the viewer
/// reference point to the transformed vertex; the reflection
/// `R = N * (2 * (N . V)) - V` is normalized and its X/Y components are
/// mapped from `[-1, 1]` into `[0, 1]`.
///
/// # Panics
/// Panics if the mesh has more vertices than `max_vertices`; that is a
/// contract violation by the caller, not a recoverable condition.
pub(crate) fn compute_env_map_uvs(
    mesh: &TriMesh,
    transform: &Mat4,
    viewer: Point3,
    max_vertices: usize,
    out: &mut Vec<[f32; 2]>,
) {
    assert!(
        mesh.vertex_count() <= max_vertices,
        "environment-mapped mesh exceeds the vertex bound ({} > {})",
        mesh.vertex_count(),
        max_vertices
    );

    let normal_transform = inverse_transpose(transform);

    out.clear();
    for (position, normal) in mesh.positions.iter().zip(&mesh.normals) {
        let normal = Vec3::new(normal[0], normal[1], normal[2]);
        let normal = normal_transform.transform_vector(&normal);
        let normal = normal.try_normalize(1.0e-12).unwrap_or(normal);

        let world = transform.transform_point(&Point3::new(position[0], position[1], position[2]));
        let eye = world - viewer;

        let dot = 2.0 * normal.dot(&eye);
        let reflected = normal * dot - eye;
        let reflected = reflected.try_normalize(1.0e-12).unwrap_or(reflected);

        out.push([reflected.x * 0.5 + 0.5, reflected.y * 0.5 + 0.5]);
    }
}
