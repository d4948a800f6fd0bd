//! Calibration data model.
//!
//! A rig is a fixed set of cameras with unknown relative extrinsics. Each
//! camera carries an immutable 3×3 intrinsic matrix and an ordered sequence
//! of target observations; observation index `i` is the same time instant
//! for every camera (synchronized capture is a precondition of the run, not
//! something the pipeline verifies).

use serde::{Deserialize, Serialize};

use crate::math::{rotation_from_rvec, rvec_from_rotation, Mat3, Mat4, Vec2, Vec3};

/// Rigid transform as a rotation vector plus translation (6 scalars).
///
/// This is the representation used for camera extrinsics (world → camera, as
/// consumed by the projection model) and for per-image PnP poses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrinsic {
    /// Rotation vector (Rodrigues form, axis times angle).
    pub rvec: Vec3,
    /// Translation vector.
    pub tvec: Vec3,
}

impl Extrinsic {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rvec: Vec3::zeros(),
            tvec: Vec3::zeros(),
        }
    }

    /// Expand into a 4×4 homogeneous matrix (rotation block, translation
    /// column, `[0, 0, 0, 1]` row).
    pub fn to_homogeneous(&self) -> Mat4 {
        let r = rotation_from_rvec(&self.rvec);
        let mut m = Mat4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.tvec);
        m
    }

    /// Collapse a rigid homogeneous matrix back into rotation-vector form.
    pub fn from_homogeneous(m: &Mat4) -> Self {
        let r = m.fixed_view::<3, 3>(0, 0).into_owned();
        Self {
            rvec: rvec_from_rotation(&r),
            tvec: m.fixed_view::<3, 1>(0, 3).into_owned(),
        }
    }
}

/// One image of the target by one camera at one time instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Detected corner coordinates, ordered like the canonical board points.
    pub corners: Vec<Vec2>,
    /// Initial pose estimate from the external PnP step (board → camera).
    pub pose: Extrinsic,
}

/// One camera of the rig.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigCamera {
    /// Component id, also the camera's directory name in a rig instance.
    pub id: String,
    /// Fixed 3×3 intrinsic calibration matrix; loaded once, never re-estimated.
    pub intrinsics: Mat3,
    /// Ordered observations, one per time instant.
    pub observations: Vec<Observation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrinsic_roundtrips_through_homogeneous() {
        let pose = Extrinsic {
            rvec: Vec3::new(0.2, -0.5, 0.1),
            tvec: Vec3::new(1.0, 2.0, -0.5),
        };
        let back = Extrinsic::from_homogeneous(&pose.to_homogeneous());
        assert!((back.rvec - pose.rvec).norm() < 1e-9);
        assert!((back.tvec - pose.tvec).norm() < 1e-12);
    }

    #[test]
    fn identity_homogeneous_is_identity_matrix() {
        assert_eq!(Extrinsic::identity().to_homogeneous(), Mat4::identity());
    }
}
