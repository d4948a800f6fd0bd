//! End-to-end run entry points.
//!
//! An instance directory holds one `instance.json` rig description and one
//! subdirectory per camera component, each with its capture images and an
//! `<id>.intrinsic.json` file. [`run_rig_calibration`] drives the whole
//! pipeline over such a directory; [`calibrate_rig`] is the second half,
//! usable directly when observations were collected elsewhere.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rigpose_core::{board_points, Mat3, Pt3, RigCamera, RigConfig};
use rigpose_optim::{BundleSolver, SolveOptions, TinySolverBundle};

use crate::detect::{collect_observations, CornerDetector, DetectionPolicy, PoseEstimator};
use crate::init::initialize_rig;
use crate::pose::{world_pose_from_extrinsic, write_world_pose, CoordinateConvention, WorldPose};

/// Key under which a camera's 3×3 matrix is stored in its intrinsics file.
pub const INTRINSICS_KEY: &str = "intrinsic-ir0";

/// Intrinsics-file failures.
#[derive(Debug, Error)]
pub enum IntrinsicsError {
    /// The file parsed but does not carry the expected key.
    #[error("intrinsics file {path} has no \"{INTRINSICS_KEY}\" entry")]
    MissingKey {
        /// Offending file.
        path: PathBuf,
    },
}

/// Everything configurable about one calibration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Least-squares solver settings.
    pub solve: SolveOptions,
    /// What a missed detection does to the run.
    pub detection_policy: DetectionPolicy,
    /// Axis convention of the written world poses.
    pub convention: CoordinateConvention,
}

/// Per-camera outcome of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraPoseReport {
    /// Component id.
    pub id: String,
    /// Refined camera → world pose.
    pub pose: WorldPose,
    /// Pose file written for this camera.
    pub file: PathBuf,
}

/// Summary of a completed calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigCalibrationReport {
    /// Per-camera poses and output files, in camera order.
    pub cameras: Vec<CameraPoseReport>,
    /// Cost `0.5‖r‖²` at the initial parameter estimate.
    pub initial_cost: f64,
    /// Cost after refinement.
    pub final_cost: f64,
}

/// Load and validate the rig description from `<dir>/instance.json`.
pub fn load_rig_config(dir: &Path) -> Result<RigConfig> {
    let path = dir.join("instance.json");
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read rig config {}", path.display()))?;
    let config: RigConfig = serde_json::from_str(&text)
        .with_context(|| format!("malformed rig config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Load one camera's fixed intrinsic matrix from `<dir>/<id>.intrinsic.json`.
pub fn load_intrinsics(dir: &Path, id: &str) -> Result<Mat3> {
    let path = dir.join(format!("{id}.intrinsic.json"));
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read intrinsics {}", path.display()))?;
    let entries: BTreeMap<String, [[f64; 3]; 3]> = serde_json::from_str(&text)
        .with_context(|| format!("malformed intrinsics {}", path.display()))?;
    let rows = entries
        .get(INTRINSICS_KEY)
        .ok_or(IntrinsicsError::MissingKey { path })?;
    Ok(Mat3::from_fn(|r, c| rows[r][c]))
}

/// Refine collected observations and write one pose file per camera.
///
/// `output_dirs[i]` receives camera `i`'s `.world.pose` file.
pub fn calibrate_rig(
    cameras: &[RigCamera],
    output_dirs: &[PathBuf],
    board: &[Pt3],
    opts: &RunOptions,
) -> Result<RigCalibrationReport> {
    ensure!(
        cameras.len() == output_dirs.len(),
        "{} cameras but {} output directories",
        cameras.len(),
        output_dirs.len()
    );

    let problem = initialize_rig(cameras, board)?.into_problem()?;
    let initial_cost = problem.initial_cost();
    log::info!(
        "refining {} cameras over {} residuals, initial cost {initial_cost:.6e}",
        cameras.len(),
        problem.residual().layout().residual_len(),
    );

    let solver = TinySolverBundle;
    let solution = problem.solve(&solver, &opts.solve)?;
    log::info!("refinement finished, final cost {:.6e}", solution.final_cost);

    let mut reports = Vec::with_capacity(cameras.len());
    for ((cam, extrinsic), dir) in cameras
        .iter()
        .zip(&solution.extrinsics)
        .zip(output_dirs)
    {
        let pose = world_pose_from_extrinsic(extrinsic, &opts.convention);
        let file = write_world_pose(dir, &cam.id, &pose)?;
        log::info!("camera {}: wrote {}", cam.id, file.display());
        reports.push(CameraPoseReport {
            id: cam.id.clone(),
            pose,
            file,
        });
    }

    Ok(RigCalibrationReport {
        cameras: reports,
        initial_cost,
        final_cost: solution.final_cost,
    })
}

/// Calibrate a whole instance directory.
///
/// Per camera component the images are every `.png` in the camera's
/// subdirectory, in lexical filename order; capture order must match across
/// cameras for the synchronization precondition to hold.
pub fn run_rig_calibration(
    instance_dir: &Path,
    detector: &dyn CornerDetector,
    estimator: &dyn PoseEstimator,
    opts: &RunOptions,
) -> Result<RigCalibrationReport> {
    let config = load_rig_config(instance_dir)?;
    let board_spec = config.board_spec();
    let board = board_points(&board_spec);

    let mut camera_inputs = Vec::new();
    let mut output_dirs = Vec::new();
    for id in config.camera_ids() {
        let dir = instance_dir.join(&id);
        let intrinsics = load_intrinsics(&dir, &id)?;
        let images = list_images(&dir)?;
        log::info!("camera {id}: {} images", images.len());
        camera_inputs.push(crate::detect::CameraImages {
            id,
            intrinsics,
            images,
        });
        output_dirs.push(dir);
    }

    let cameras = collect_observations(
        &camera_inputs,
        &board,
        &board_spec,
        detector,
        estimator,
        opts.detection_policy,
    )?;
    calibrate_rig(&cameras, &output_dirs, &board, opts)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}
