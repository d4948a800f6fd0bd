//! Capability interfaces for the external detection and PnP collaborators.
//!
//! Corner detection and perspective-n-point estimation are vision-library
//! concerns; the pipeline only depends on these narrow traits so the core
//! logic can run against deterministic fakes in tests. A missed detection is
//! an expected outcome, not an I/O error: [`Detection::NotFound`] travels
//! back as data and [`DetectionPolicy`] decides whether it kills the run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rigpose_core::{BoardSpec, Extrinsic, Mat3, Observation, Pt3, RigCamera, Vec2};

/// Outcome of looking for the target in one image.
#[derive(Debug, Clone)]
pub enum Detection {
    /// Ordered corner coordinates, matching the canonical board ordering.
    Found(Vec<Vec2>),
    /// The target is not visible (or not recognizable) in this image.
    NotFound,
}

/// External checkerboard corner detector with sub-pixel refinement.
pub trait CornerDetector {
    /// Look for the board in one image file.
    fn detect(&self, image: &Path, board: &BoardSpec) -> Result<Detection>;
}

/// External perspective-n-point pose estimator.
pub trait PoseEstimator {
    /// Estimate the board → camera pose from matched 2D–3D correspondences.
    fn estimate(&self, board: &[Pt3], corners: &[Vec2], intrinsics: &Mat3) -> Result<Extrinsic>;
}

/// What to do when the target is missing from an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPolicy {
    /// Abort the whole run on the first missed detection.
    #[default]
    Abort,
    /// Drop the failing time instant across every camera, keeping the
    /// per-instant alignment between cameras intact.
    SkipInstant,
}

/// Detection-stage failures.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The board was not found and the policy is [`DetectionPolicy::Abort`].
    #[error("failed to find checkerboard in image {0}")]
    BoardNotFound(PathBuf),
    /// Cameras disagree on how many images they captured.
    #[error("cameras have unequal image counts: {0:?}")]
    UnequalImageCounts(Vec<usize>),
    /// Skipping left nothing to calibrate from.
    #[error("no usable time instants remain after skipping failed detections")]
    NoInstants,
}

/// Image lists for one camera. Index `i` across cameras is one time instant.
#[derive(Debug, Clone)]
pub struct CameraImages {
    /// Component id.
    pub id: String,
    /// Fixed 3×3 intrinsic matrix.
    pub intrinsics: Mat3,
    /// Image files in capture order.
    pub images: Vec<PathBuf>,
}

/// Run detection and PnP over every camera/image, applying the failure policy.
///
/// Returns one [`RigCamera`] per input camera, each holding the same number
/// of observations (the surviving time instants, in capture order).
pub fn collect_observations(
    cameras: &[CameraImages],
    board: &[Pt3],
    board_spec: &BoardSpec,
    detector: &dyn CornerDetector,
    estimator: &dyn PoseEstimator,
    policy: DetectionPolicy,
) -> Result<Vec<RigCamera>> {
    let counts: Vec<usize> = cameras.iter().map(|c| c.images.len()).collect();
    if counts.windows(2).any(|w| w[0] != w[1]) {
        return Err(DetectError::UnequalImageCounts(counts).into());
    }
    let num_instants = counts.first().copied().unwrap_or(0);

    // Detect everything first so the skip policy can reason per instant.
    let mut detections: Vec<Vec<Option<Vec<Vec2>>>> = Vec::with_capacity(cameras.len());
    for cam in cameras {
        let mut per_camera = Vec::with_capacity(num_instants);
        for image in &cam.images {
            match detector.detect(image, board_spec)? {
                Detection::Found(corners) => per_camera.push(Some(corners)),
                Detection::NotFound => match policy {
                    DetectionPolicy::Abort => {
                        return Err(DetectError::BoardNotFound(image.clone()).into());
                    }
                    DetectionPolicy::SkipInstant => {
                        log::warn!("no checkerboard in {}, skipping instant", image.display());
                        per_camera.push(None);
                    }
                },
            }
        }
        detections.push(per_camera);
    }

    // An instant survives only if every camera saw the board in it.
    let usable: Vec<usize> = (0..num_instants)
        .filter(|&i| detections.iter().all(|d| d[i].is_some()))
        .collect();
    if usable.is_empty() {
        return Err(DetectError::NoInstants.into());
    }

    let mut out = Vec::with_capacity(cameras.len());
    for (cam, per_camera) in cameras.iter().zip(detections) {
        let mut observations = Vec::with_capacity(usable.len());
        for &i in &usable {
            let corners = per_camera[i]
                .clone()
                .expect("usable instants have detections for every camera");
            let pose = estimator.estimate(board, &corners, &cam.intrinsics)?;
            observations.push(Observation { corners, pose });
        }
        out.push(RigCamera {
            id: cam.id.clone(),
            intrinsics: cam.intrinsics,
            observations,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigpose_core::Vec3;
    use std::collections::HashSet;

    /// Fake detector: finds a one-corner board everywhere except on
    /// blacklisted paths.
    struct FakeDetector {
        missing: HashSet<PathBuf>,
    }

    impl CornerDetector for FakeDetector {
        fn detect(&self, image: &Path, _board: &BoardSpec) -> Result<Detection> {
            if self.missing.contains(image) {
                Ok(Detection::NotFound)
            } else {
                // Encode the path length so corners differ per image.
                let tag = image.as_os_str().len() as f64;
                Ok(Detection::Found(vec![Vec2::new(tag, tag + 0.5)]))
            }
        }
    }

    struct FakeEstimator;

    impl PoseEstimator for FakeEstimator {
        fn estimate(
            &self,
            _board: &[Pt3],
            corners: &[Vec2],
            _intrinsics: &Mat3,
        ) -> Result<Extrinsic> {
            Ok(Extrinsic {
                rvec: Vec3::zeros(),
                tvec: Vec3::new(corners[0].x, 0.0, 1.0),
            })
        }
    }

    fn spec() -> BoardSpec {
        BoardSpec {
            cols: 1,
            rows: 1,
            square_edge: 0.1,
            offset: Vec3::zeros(),
            swap_xz: true,
        }
    }

    fn cameras() -> Vec<CameraImages> {
        ["a", "b"]
            .iter()
            .map(|id| CameraImages {
                id: (*id).to_string(),
                intrinsics: Mat3::identity(),
                images: (0..3).map(|i| PathBuf::from(format!("{id}/{i}.png"))).collect(),
            })
            .collect()
    }

    #[test]
    fn abort_policy_fails_on_first_miss() {
        let detector = FakeDetector {
            missing: HashSet::from([PathBuf::from("b/1.png")]),
        };
        let board = vec![Pt3::origin()];
        let err = collect_observations(
            &cameras(),
            &board,
            &spec(),
            &detector,
            &FakeEstimator,
            DetectionPolicy::Abort,
        )
        .unwrap_err();
        assert!(err.to_string().contains("b/1.png"), "got: {err}");
    }

    #[test]
    fn skip_policy_drops_the_instant_for_every_camera() {
        let detector = FakeDetector {
            missing: HashSet::from([PathBuf::from("b/1.png")]),
        };
        let board = vec![Pt3::origin()];
        let cams = collect_observations(
            &cameras(),
            &board,
            &spec(),
            &detector,
            &FakeEstimator,
            DetectionPolicy::SkipInstant,
        )
        .unwrap();

        for cam in &cams {
            assert_eq!(cam.observations.len(), 2, "instant 1 should be dropped");
        }
        // Camera a keeps its instants 0 and 2, in order.
        let tags: Vec<f64> = cams[0].observations.iter().map(|o| o.corners[0].x).collect();
        let expect_0 = "a/0.png".len() as f64;
        let expect_2 = "a/2.png".len() as f64;
        assert_eq!(tags, vec![expect_0, expect_2]);
    }

    #[test]
    fn all_instants_missing_is_an_error() {
        let detector = FakeDetector {
            missing: (0..3).map(|i| PathBuf::from(format!("a/{i}.png"))).collect(),
        };
        let board = vec![Pt3::origin()];
        let err = collect_observations(
            &cameras(),
            &board,
            &spec(),
            &detector,
            &FakeEstimator,
            DetectionPolicy::SkipInstant,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no usable time instants"));
    }

    #[test]
    fn unequal_image_counts_are_rejected() {
        let mut cams = cameras();
        cams[1].images.pop();
        let detector = FakeDetector {
            missing: HashSet::new(),
        };
        let board = vec![Pt3::origin()];
        let err = collect_observations(
            &cams,
            &board,
            &spec(),
            &detector,
            &FakeEstimator,
            DetectionPolicy::Abort,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unequal image counts"));
    }
}
