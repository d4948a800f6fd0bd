//! Rotation-vector (Rodrigues) and homogeneous-transform helpers.
//!
//! Rotations travel through the calibration as 3-parameter rotation vectors
//! (axis times angle). The helpers here convert between that representation,
//! rotation matrices, and 4×4 homogeneous rigid transforms.

use nalgebra::{Matrix3, RealField, Rotation3, Vector3};

use crate::math::{Mat3, Mat4, Vec3};
use crate::models::Extrinsic;

/// Angle below which the exponential map falls back to its first-order expansion.
const SMALL_ANGLE: f64 = 1e-12;

fn skew<T: RealField>(v: &Vector3<T>) -> Matrix3<T> {
    let zero = T::zero();
    Matrix3::new(
        zero.clone(),
        -v.z.clone(),
        v.y.clone(),
        v.z.clone(),
        zero.clone(),
        -v.x.clone(),
        -v.y.clone(),
        v.x.clone(),
        zero,
    )
}

/// Convert a rotation vector into a rotation matrix via the exponential map.
///
/// Generic over the scalar so the conversion also runs on dual numbers during
/// automatic differentiation.
pub fn rotation_from_rvec<T: RealField>(rvec: &Vector3<T>) -> Matrix3<T> {
    let theta = rvec.norm();
    if theta < T::from_f64(SMALL_ANGLE).unwrap() {
        // First-order expansion: R ≈ I + [r]×
        return Matrix3::identity() + skew(rvec);
    }
    let axis = rvec.clone() / theta.clone();
    let k = skew(&axis);
    Matrix3::identity()
        + k.clone() * theta.clone().sin()
        + (k.clone() * k) * (T::one() - theta.cos())
}

/// Recover the rotation vector of a (near-)rotation matrix.
pub fn rvec_from_rotation(m: &Mat3) -> Vec3 {
    Rotation3::from_matrix(m).scaled_axis()
}

/// Invert a rigid homogeneous transform using its block structure.
pub fn invert_homogeneous(m: &Mat4) -> Mat4 {
    let r = m.fixed_view::<3, 3>(0, 0).into_owned();
    let t = m.fixed_view::<3, 1>(0, 3).into_owned();
    let rt = r.transpose();
    let mut out = Mat4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-(rt * t)));
    out
}

/// Rigid transform aligning points expressed in pose `b`'s frame with pose
/// `a`'s frame: `inverse(H(a)) · H(b)`, returned as rotation block and
/// translation column.
///
/// For any pose `p`, `relative_transform(p, p)` is the identity.
pub fn relative_transform(a: &Extrinsic, b: &Extrinsic) -> (Mat3, Vec3) {
    let h = invert_homogeneous(&a.to_homogeneous()) * b.to_homogeneous();
    (
        h.fixed_view::<3, 3>(0, 0).into_owned(),
        h.fixed_view::<3, 1>(0, 3).into_owned(),
    )
}
