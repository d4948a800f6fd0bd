//! Synthetic rigs for tests.
//!
//! The helpers here build a ground-truth rig (known extrinsics, known board
//! motion) and produce exact, noise-free observations: corner coordinates are
//! ideal projections and each per-image pose is the exact composition of the
//! camera extrinsic with the board motion, so the synthetic PnP output is
//! consistent with the synthetic detections.

use rand::Rng;

use crate::math::{project_pinhole_k, Mat3, Pt3, Real, Vec3};
use crate::models::{Extrinsic, Observation, RigCamera};
use crate::target::{board_points, BoardSpec};

/// A ground-truth rig with a board moving through known poses.
#[derive(Debug, Clone)]
pub struct SyntheticRig {
    /// Canonical board corners.
    pub board: Vec<Pt3>,
    /// Ground-truth world → camera extrinsics, one per camera.
    pub extrinsics: Vec<Extrinsic>,
    /// Board pose per time instant; `motion[0]` is the identity.
    pub motion: Vec<Extrinsic>,
    /// Cameras with exact observations.
    pub cameras: Vec<RigCamera>,
}

/// Intrinsics used by the synthetic rigs.
pub fn default_intrinsics() -> Mat3 {
    Mat3::new(800.0, 0.0, 640.0, 0.0, 780.0, 360.0, 0.0, 0.0, 1.0)
}

/// Produce exact observations for every camera and instant.
///
/// `extrinsics`, `intrinsics` and `ids` run per camera; `motion` runs per
/// instant and its first entry should be the identity so instant 0 sees the
/// canonical board.
pub fn observe_rig(
    ids: &[&str],
    intrinsics: &[Mat3],
    extrinsics: &[Extrinsic],
    motion: &[Extrinsic],
    board: &[Pt3],
) -> Vec<RigCamera> {
    assert_eq!(ids.len(), extrinsics.len());
    assert_eq!(ids.len(), intrinsics.len());

    let mut cameras = Vec::with_capacity(ids.len());
    for ((id, k), extrinsic) in ids.iter().zip(intrinsics).zip(extrinsics) {
        let mut observations = Vec::with_capacity(motion.len());
        for instant in motion {
            // Board-local → camera for this instant.
            let h = extrinsic.to_homogeneous() * instant.to_homogeneous();
            let corners = board
                .iter()
                .map(|p| {
                    let pc = h.transform_point(p);
                    project_pinhole_k(k, &pc.coords)
                })
                .collect();
            observations.push(Observation {
                corners,
                pose: Extrinsic::from_homogeneous(&h),
            });
        }
        cameras.push(RigCamera {
            id: (*id).to_string(),
            intrinsics: *k,
            observations,
        });
    }
    cameras
}

/// A two-camera rig observing a board over `num_instants` synchronized
/// captures. The board sits roughly two meters in front of both cameras.
pub fn two_camera_rig(spec: &BoardSpec, num_instants: usize) -> SyntheticRig {
    let board = board_points(spec);

    let extrinsics = vec![
        Extrinsic {
            rvec: Vec3::new(0.0, 0.0, 0.0),
            tvec: Vec3::new(0.0, 0.0, 2.0),
        },
        Extrinsic {
            rvec: Vec3::new(0.02, 0.12, -0.03),
            tvec: Vec3::new(-0.15, 0.03, 2.05),
        },
    ];

    let motion: Vec<Extrinsic> = (0..num_instants)
        .map(|i| {
            let s = i as Real;
            Extrinsic {
                rvec: Vec3::new(0.04 * s, -0.03 * s, 0.05 * s),
                tvec: Vec3::new(0.03 * s, -0.02 * s, 0.04 * s),
            }
        })
        .collect();

    let k = default_intrinsics();
    let cameras = observe_rig(
        &["cam0", "cam1"],
        &[k, k],
        &extrinsics,
        &motion,
        &board,
    );

    SyntheticRig {
        board,
        extrinsics,
        motion,
        cameras,
    }
}

/// Jitter a pose uniformly, for seeding convergence tests away from the
/// ground truth.
pub fn perturbed_pose<R: Rng>(
    pose: &Extrinsic,
    rot_eps: Real,
    trans_eps: Real,
    rng: &mut R,
) -> Extrinsic {
    let mut jitter = |eps: Real| {
        Vec3::new(
            rng.gen_range(-eps..=eps),
            rng.gen_range(-eps..=eps),
            rng.gen_range(-eps..=eps),
        )
    };
    Extrinsic {
        rvec: pose.rvec + jitter(rot_eps),
        tvec: pose.tvec + jitter(trans_eps),
    }
}
