//! World-pose conversion and the `.world.pose` file format.
//!
//! The optimizer produces world → camera extrinsics in the projection
//! model's axis convention; the downstream consumer wants camera → world
//! poses under its own axes, with a scalar-first quaternion. The basis
//! change between the two conventions is a named value here rather than an
//! inline constant so alternate conventions stay testable.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nalgebra::{Quaternion, Rotation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use rigpose_core::{invert_homogeneous, Extrinsic, Mat4, Vec3};

/// Basis change applied on both sides when mapping camera extrinsics into
/// world poses: `camToWorld = B · inverse(worldToCam) · Bᵀ`.
///
/// The basis matrix must be orthogonal (its transpose is used as its
/// inverse); axis-remap matrices such as the default Y-flip satisfy this by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateConvention {
    basis: Mat4,
}

impl CoordinateConvention {
    /// Y-flip convention (`diag(1, −1, 1, 1)`) expected by the pose-file
    /// consumer.
    pub fn y_flip() -> Self {
        Self {
            basis: Mat4::from_diagonal(&nalgebra::Vector4::new(1.0, -1.0, 1.0, 1.0)),
        }
    }

    /// No axis remap at all.
    pub fn identity() -> Self {
        Self {
            basis: Mat4::identity(),
        }
    }

    /// An arbitrary orthogonal basis change.
    pub fn from_basis(basis: Mat4) -> Self {
        Self { basis }
    }

    /// The basis matrix.
    pub fn basis(&self) -> &Mat4 {
        &self.basis
    }
}

impl Default for CoordinateConvention {
    fn default() -> Self {
        Self::y_flip()
    }
}

/// Camera pose in the world frame (camera → world convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPose {
    /// Camera position in world coordinates.
    pub position: Vec3,
    /// Unit quaternion, scalar-first `(w, x, y, z)`. The component order is
    /// a hard contract with the pose-file consumer.
    pub orientation: [f64; 4],
}

/// Map an optimized world → camera extrinsic into a world pose.
pub fn world_pose_from_extrinsic(
    extrinsic: &Extrinsic,
    convention: &CoordinateConvention,
) -> WorldPose {
    let world_to_cam = extrinsic.to_homogeneous();
    let cam_to_world =
        convention.basis * invert_homogeneous(&world_to_cam) * convention.basis.transpose();

    let position = cam_to_world.fixed_view::<3, 1>(0, 3).into_owned();
    let rot = cam_to_world.fixed_view::<3, 3>(0, 0).into_owned();
    let q = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&rot));
    WorldPose {
        position,
        orientation: [q.w, q.i, q.j, q.k],
    }
}

/// Inverse of [`world_pose_from_extrinsic`], for round-trip verification.
pub fn extrinsic_from_world_pose(pose: &WorldPose, convention: &CoordinateConvention) -> Extrinsic {
    let [w, x, y, z] = pose.orientation;
    let q = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));

    let mut cam_to_world = Mat4::identity();
    cam_to_world
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(q.to_rotation_matrix().matrix());
    cam_to_world
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&pose.position);

    // camToWorld = B · inv(worldToCam) · Bᵀ, with B orthogonal, inverts to
    // worldToCam = inv(Bᵀ · camToWorld · B).
    let world_to_cam =
        invert_homogeneous(&(convention.basis.transpose() * cam_to_world * convention.basis));
    Extrinsic::from_homogeneous(&world_to_cam)
}

/// Fixed leading placeholder required by the consuming format.
const POSE_RECORD_TAG: f64 = 0.0;
/// Digits after the decimal point in pose records.
const POSE_DECIMALS: usize = 24;

/// Serialize one camera's world pose to `<dir>/<id>.world.pose`.
///
/// The record is a single comma-separated row
/// `0, tx, ty, tz, qw, qx, qy, qz`, every field (the placeholder included)
/// printed with 24 digits after the decimal point, unquoted.
pub fn write_world_pose(dir: &Path, id: &str, pose: &WorldPose) -> Result<PathBuf> {
    let path = dir.join(format!("{id}.world.pose"));
    let [w, x, y, z] = pose.orientation;
    let fields = [
        POSE_RECORD_TAG,
        pose.position.x,
        pose.position.y,
        pose.position.z,
        w,
        x,
        y,
        z,
    ];
    let record = fields
        .iter()
        .map(|v| format!("{v:.prec$}", prec = POSE_DECIMALS))
        .collect::<Vec<_>>()
        .join(",");
    fs::write(&path, record + "\n")
        .with_context(|| format!("failed to write pose file {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn quaternion_is_unit_norm_and_scalar_first() {
        let extrinsic = Extrinsic {
            rvec: Vec3::new(0.3, -0.2, 0.8),
            tvec: Vec3::new(0.5, 1.0, 2.0),
        };
        let pose = world_pose_from_extrinsic(&extrinsic, &CoordinateConvention::default());
        let norm: f64 = pose.orientation.iter().map(|c| c * c).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quarter_turn_matches_closed_form() {
        // Under the identity convention: a camera rotated 90° about Z with no
        // translation inverts to a −90° world rotation about Z, i.e.
        // (w, x, y, z) = (cos 45°, 0, 0, −sin 45°).
        let extrinsic = Extrinsic {
            rvec: Vec3::new(0.0, 0.0, FRAC_PI_2),
            tvec: Vec3::zeros(),
        };
        let pose = world_pose_from_extrinsic(&extrinsic, &CoordinateConvention::identity());
        let half = FRAC_PI_2 / 2.0;
        let expected = [half.cos(), 0.0, 0.0, -half.sin()];
        for (got, want) in pose.orientation.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{:?}", pose.orientation);
        }
        assert!(pose.position.norm() < 1e-12);
    }

    #[test]
    fn converter_round_trips_under_the_default_convention() {
        let extrinsic = Extrinsic {
            rvec: Vec3::new(-0.4, 0.1, 0.25),
            tvec: Vec3::new(1.5, -0.5, 2.5),
        };
        let convention = CoordinateConvention::default();
        let pose = world_pose_from_extrinsic(&extrinsic, &convention);
        let back = extrinsic_from_world_pose(&pose, &convention);
        assert!((back.rvec - extrinsic.rvec).norm() < 1e-9, "{back:?}");
        assert!((back.tvec - extrinsic.tvec).norm() < 1e-9, "{back:?}");
    }

    #[test]
    fn y_flip_negates_the_y_translation() {
        let extrinsic = Extrinsic {
            rvec: Vec3::zeros(),
            tvec: Vec3::new(0.5, 1.0, -2.0),
        };
        // With identity rotation, camToWorld translation is −t with the Y
        // component flipped back by the basis change.
        let pose = world_pose_from_extrinsic(&extrinsic, &CoordinateConvention::y_flip());
        assert!((pose.position - Vec3::new(-0.5, 1.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn pose_file_has_eight_fixed_precision_fields() {
        let dir = tempfile::tempdir().unwrap();
        let pose = WorldPose {
            position: Vec3::new(1.25, -0.5, 3.0),
            orientation: [1.0, 0.0, 0.0, 0.0],
        };
        let path = write_world_pose(dir.path(), "cam0", &pose).unwrap();
        assert!(path.ends_with("cam0.world.pose"));

        let contents = fs::read_to_string(&path).unwrap();
        let fields: Vec<&str> = contents.trim_end().split(',').collect();
        assert_eq!(fields.len(), 8);
        for field in &fields {
            let decimals = field.split('.').nth(1).unwrap();
            assert_eq!(decimals.len(), 24, "field {field} lacks 24 decimals");
        }
        assert!(fields[0].starts_with("0.000"));
        assert!(fields[1].starts_with("1.250"));
        assert!(fields[4].starts_with("1.000"));
    }
}
