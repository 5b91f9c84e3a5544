//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics, backed by nalgebra.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Compute the inverse-transpose of a transform, used to carry normals
/// through a (possibly non-uniformly scaling) world transform.
///
/// Singular transforms fall back to the identity rather than producing
/// garbage normals.
#[must_use]
pub fn inverse_transpose(transform: &Mat4) -> Mat4 {
    transform
        .try_inverse()
        .map_or_else(Mat4::identity, |inv| inv.transpose())
}
