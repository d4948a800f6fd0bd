//! Seeding the bundle adjustment from per-image PnP poses.
//!
//! Extrinsics are seeded directly from each camera's instant-0 pose. Board
//! motion is propagated from the reference camera (index 0) alone: for every
//! later instant the rigid transform relating the reference camera's pose at
//! that instant to its instant-0 pose is applied to the canonical board
//! points. This trusts the reference camera's PnP history enough to seed the
//! optimizer; all cameras and all points are refined jointly afterwards.

use anyhow::{ensure, Result};
use nalgebra::DVector;

use rigpose_core::{relative_transform, Extrinsic, Mat3, Pt3, RigCamera};
use rigpose_optim::{ParamLayout, ReprojectionResidual, RigBundleProblem};

/// Initial state for one rig bundle run.
#[derive(Debug, Clone)]
pub struct RigInit {
    /// Parameter layout of the run.
    pub layout: ParamLayout,
    /// Seed extrinsics, one per camera (instant-0 PnP poses).
    pub extrinsics: Vec<Extrinsic>,
    /// Seed board points per instant, in the common reference frame.
    pub instant_points: Vec<Vec<Pt3>>,
    /// Pooled observed corners in camera-major, image-major, point-major
    /// order, matching the residual engine index-for-index.
    pub observed: DVector<f64>,
    /// Per-camera intrinsic matrices, in camera order.
    pub intrinsics: Vec<Mat3>,
}

/// Build the initial parameter state from collected observations.
pub fn initialize_rig(cameras: &[RigCamera], board: &[Pt3]) -> Result<RigInit> {
    ensure!(!cameras.is_empty(), "need at least one camera");
    ensure!(!board.is_empty(), "board has no points");

    let num_instants = cameras[0].observations.len();
    ensure!(num_instants > 0, "cameras have no observations");
    for cam in cameras {
        ensure!(
            cam.observations.len() == num_instants,
            "camera {} has {} observations, expected {}",
            cam.id,
            cam.observations.len(),
            num_instants
        );
        for (i, obs) in cam.observations.iter().enumerate() {
            ensure!(
                obs.corners.len() == board.len(),
                "camera {} instant {} has {} corners, expected {}",
                cam.id,
                i,
                obs.corners.len(),
                board.len()
            );
        }
    }

    let layout = ParamLayout {
        num_cameras: cameras.len(),
        num_instants,
        points_per_instant: board.len(),
    };

    let extrinsics: Vec<Extrinsic> = cameras.iter().map(|c| c.observations[0].pose).collect();

    // Instant 0 sees the canonical board; later instants get the board moved
    // by the reference camera's own relative pose history.
    let reference = &cameras[0];
    let mut instant_points = Vec::with_capacity(num_instants);
    instant_points.push(board.to_vec());
    for i in 1..num_instants {
        let (r_rel, t_rel) = relative_transform(
            &reference.observations[0].pose,
            &reference.observations[i].pose,
        );
        instant_points.push(
            board
                .iter()
                .map(|p| Pt3::from(r_rel * p.coords + t_rel))
                .collect(),
        );
    }

    let mut observed = DVector::zeros(layout.residual_len());
    let mut idx = 0;
    for cam in cameras {
        for obs in &cam.observations {
            for uv in &obs.corners {
                observed[idx] = uv.x;
                observed[idx + 1] = uv.y;
                idx += 2;
            }
        }
    }

    let intrinsics = cameras.iter().map(|c| c.intrinsics).collect();

    Ok(RigInit {
        layout,
        extrinsics,
        instant_points,
        observed,
        intrinsics,
    })
}

impl RigInit {
    /// Flatten into a ready-to-solve bundle problem.
    pub fn into_problem(self) -> Result<RigBundleProblem> {
        let initial = self.layout.flatten(&self.extrinsics, &self.instant_points)?;
        let residual = ReprojectionResidual::new(self.layout, self.intrinsics, self.observed)?;
        RigBundleProblem::new(residual, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigpose_core::synthetic::two_camera_rig;
    use rigpose_core::{BoardSpec, Vec3};

    fn spec() -> BoardSpec {
        BoardSpec {
            cols: 3,
            rows: 3,
            square_edge: 0.1,
            offset: Vec3::zeros(),
            swap_xz: true,
        }
    }

    #[test]
    fn extrinsics_seeded_from_instant_zero() {
        let rig = two_camera_rig(&spec(), 3);
        let init = initialize_rig(&rig.cameras, &rig.board).unwrap();
        for (seed, gt) in init.extrinsics.iter().zip(&rig.extrinsics) {
            assert!((seed.rvec - gt.rvec).norm() < 1e-9);
            assert!((seed.tvec - gt.tvec).norm() < 1e-9);
        }
    }

    #[test]
    fn motion_propagation_recovers_true_board_positions() {
        // With exact PnP poses, the relative-transform propagation must land
        // the instant points exactly on the moved board.
        let rig = two_camera_rig(&spec(), 3);
        let init = initialize_rig(&rig.cameras, &rig.board).unwrap();

        for (instant, motion) in rig.motion.iter().enumerate() {
            let h = motion.to_homogeneous();
            for (seeded, canonical) in init.instant_points[instant].iter().zip(&rig.board) {
                let expected = h.transform_point(canonical);
                assert!(
                    (seeded - expected).norm() < 1e-9,
                    "instant {instant}: {seeded:?} vs {expected:?}"
                );
            }
        }
    }

    #[test]
    fn observed_pooling_is_camera_then_image_then_point_major() {
        let rig = two_camera_rig(&spec(), 2);
        let init = initialize_rig(&rig.cameras, &rig.board).unwrap();
        assert_eq!(init.observed.len(), init.layout.residual_len());

        // First camera, first image, first corner occupies slots 0/1.
        let first = rig.cameras[0].observations[0].corners[0];
        assert_eq!(init.observed[0], first.x);
        assert_eq!(init.observed[1], first.y);

        // Second camera's block starts after all of camera 0's corners.
        let offset = 2 * 2 * rig.board.len();
        let second = rig.cameras[1].observations[0].corners[0];
        assert_eq!(init.observed[offset], second.x);
        assert_eq!(init.observed[offset + 1], second.y);
    }

    #[test]
    fn mismatched_observation_counts_are_rejected() {
        let mut rig = two_camera_rig(&spec(), 3);
        rig.cameras[1].observations.pop();
        let err = initialize_rig(&rig.cameras, &rig.board).unwrap_err();
        assert!(err.to_string().contains("observations"));
    }

    #[test]
    fn mismatched_corner_counts_are_rejected() {
        let mut rig = two_camera_rig(&spec(), 2);
        rig.cameras[0].observations[1].corners.pop();
        let err = initialize_rig(&rig.cameras, &rig.board).unwrap_err();
        assert!(err.to_string().contains("corners"));
    }

    #[test]
    fn zero_cost_at_exact_initialization() {
        // Exact observations and exact PnP poses make the seed itself a
        // global optimum.
        let rig = two_camera_rig(&spec(), 3);
        let problem = initialize_rig(&rig.cameras, &rig.board)
            .unwrap()
            .into_problem()
            .unwrap();
        assert!(problem.initial_cost() < 1e-18);
    }
}
