//! Spatial primitives for the slice-transform pipeline
//!
//! Thin aliases over nalgebra, following the convention of medical-imaging
//! Rust code: all geometry is `f64`, rigid transforms are `Isometry3`.
//!
//! Transform naming reads right-to-left: `rMt` maps tool-local coordinates
//! into reference space, `sMr` maps reference space into slice space, and
//! `sMr = rMs⁻¹` where `rMs` is built from the slice-plane basis.

use nalgebra::{Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, UnitVector3};

/// 3D vector in millimeters
pub type Vector3 = nalgebra::Vector3<f64>;

/// Rigid transform (rotation + translation) between two coordinate spaces
pub type Transform3 = nalgebra::Isometry3<f64>;

/// Tolerance used by the degeneracy guards
pub const TOLERANCE: f64 = 1e-6;

/// Apply a transform to a point (rotation + translation)
pub fn transform_point(m: &Transform3, p: Vector3) -> Vector3 {
    (m * Point3::from(p)).coords
}

/// Apply a transform to a direction (rotation only)
pub fn transform_vector(m: &Transform3, v: Vector3) -> Vector3 {
    m.rotation * v
}

/// Rotation about the world Y axis
pub fn rotate_y(angle: f64) -> Transform3 {
    Transform3::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), angle),
    )
}

/// Rotation about the world Z axis
pub fn rotate_z(angle: f64) -> Transform3 {
    Transform3::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_axis_angle(&nalgebra::Vector3::z_axis(), angle),
    )
}

/// Translation by `t`
pub fn translate(t: Vector3) -> Transform3 {
    Transform3::from_parts(Translation3::from(t), UnitQuaternion::identity())
}

/// Build the plane-to-reference transform `rMs` from an in-plane basis
///
/// `i` and `j` must be unit length and orthogonal; the plane normal is
/// `k = i × j` and `c` becomes the slice-space origin expressed in
/// reference coordinates. The slice transform published by the pipeline is
/// the inverse of this frame.
pub fn transform_ijc(i: Vector3, j: Vector3, c: Vector3) -> Transform3 {
    let k = i.cross(&j);
    let rot = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[i, j, k]));
    Transform3::from_parts(
        Translation3::from(c),
        UnitQuaternion::from_rotation_matrix(&rot),
    )
}

/// Normalize `v`, or return `None` when its length is below [`TOLERANCE`]
pub fn try_normalize(v: Vector3) -> Option<Vector3> {
    UnitVector3::try_new(v, TOLERANCE).map(|u| u.into_inner())
}
