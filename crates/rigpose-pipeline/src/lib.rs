//! End-to-end multi-camera rig world-pose calibration.
//!
//! # Pipeline
//!
//! A calibration run proceeds in five steps, fully synchronous and single
//! pass:
//!
//! 1. **Collection**: detect checkerboard corners and estimate a per-image
//!    PnP pose for every camera/image (external capabilities, see
//!    [`detect::CornerDetector`] and [`detect::PoseEstimator`]).
//! 2. **Initialization**: seed camera extrinsics from the instant-0 poses and
//!    propagate the board's motion through the reference camera's pose
//!    history ([`init::initialize_rig`]).
//! 3. **Bundle adjustment**: one blocking least-squares solve refining all
//!    extrinsics and per-instant board points jointly.
//! 4. **Conversion**: map each refined world → camera extrinsic into a
//!    camera → world pose under a named axis convention ([`pose`]).
//! 5. **Writing**: one `.world.pose` record per camera.
//!
//! # Conventions
//!
//! - Extrinsics are world → camera, as consumed by the projection model.
//! - Observation index `i` is the same time instant for every camera; the
//!   run's precondition is that captures are synchronized.
//! - Pose files are camera → world with a scalar-first quaternion.

/// Detection and PnP capability interfaces plus the failure policy.
pub mod detect;
/// Seeding the bundle adjustment from per-image PnP poses.
pub mod init;
/// World-pose conversion and the `.world.pose` file format.
pub mod pose;
/// End-to-end run entry points.
pub mod run;

pub use detect::{
    collect_observations, CameraImages, CornerDetector, Detection, DetectionPolicy, PoseEstimator,
};
pub use init::{initialize_rig, RigInit};
pub use pose::{
    extrinsic_from_world_pose, world_pose_from_extrinsic, write_world_pose,
    CoordinateConvention, WorldPose,
};
pub use run::{
    calibrate_rig, load_intrinsics, load_rig_config, run_rig_calibration, CameraPoseReport,
    RigCalibrationReport, RunOptions, INTRINSICS_KEY,
};
