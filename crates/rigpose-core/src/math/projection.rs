//! Pinhole projection through a full 3×3 intrinsic matrix.

use nalgebra::{Matrix3, RealField, Vector2, Vector3};

/// Default epsilon added to depth for numerical stability.
pub const PROJECTION_EPS: f64 = 1.0e-9;

/// Project a camera-frame point: perspective divide, then apply the intrinsic
/// calibration `K` (including skew). Distortion is not modeled.
pub fn project_pinhole_k<T: RealField>(k: &Matrix3<T>, pc: &Vector3<T>) -> Vector2<T> {
    let z = pc.z.clone() + T::from_f64(PROJECTION_EPS).unwrap();
    let xn = pc.x.clone() / z.clone();
    let yn = pc.y.clone() / z;
    Vector2::new(
        k[(0, 0)].clone() * xn + k[(0, 1)].clone() * yn.clone() + k[(0, 2)].clone(),
        k[(1, 1)].clone() * yn + k[(1, 2)].clone(),
    )
}
