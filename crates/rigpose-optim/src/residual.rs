//! Reprojection residual engine.

use anyhow::{ensure, Result};
use nalgebra::{DVector, RealField};
use tiny_solver::factors::Factor;

use rigpose_core::{project_pinhole_k, rotation_from_rvec, Mat3};

use crate::params::ParamLayout;

/// Signed reprojection differences over every camera/point pair.
///
/// Holds everything that stays constant during one run: the parameter layout,
/// per-camera intrinsics, and the pooled observed corners in camera-major,
/// then image-major, then point-major order. The residual output matches that
/// pooling index-for-index; nothing re-validates the order later, so the
/// constructor is the checkpoint where lengths are enforced.
#[derive(Debug, Clone)]
pub struct ReprojectionResidual {
    layout: ParamLayout,
    intrinsics: Vec<Mat3>,
    observed: DVector<f64>,
}

impl ReprojectionResidual {
    /// Build the engine, checking the observed vector against the layout.
    pub fn new(layout: ParamLayout, intrinsics: Vec<Mat3>, observed: DVector<f64>) -> Result<Self> {
        ensure!(
            intrinsics.len() == layout.num_cameras,
            "intrinsics count {} != camera count {}",
            intrinsics.len(),
            layout.num_cameras
        );
        ensure!(
            observed.len() == layout.residual_len(),
            "observed vector length {} != 2·C·I·|board| = {}",
            observed.len(),
            layout.residual_len()
        );
        Ok(Self {
            layout,
            intrinsics,
            observed,
        })
    }

    /// Layout shared with the solver.
    pub fn layout(&self) -> ParamLayout {
        self.layout
    }

    /// Pooled observed corners.
    pub fn observed(&self) -> &DVector<f64> {
        &self.observed
    }

    /// `observed − projected`, length `2·C·I·|board|`.
    ///
    /// Each camera projects the entire pooled point set (all instants) with
    /// its own extrinsic, so the output ordering mirrors the observed-corner
    /// pooling exactly.
    pub fn residual_generic<T: RealField>(&self, params: &DVector<T>) -> DVector<T> {
        let (poses, points) = self.layout.unflatten(params);
        let mut out = DVector::zeros(self.layout.residual_len());
        let mut idx = 0;
        for (ci, k) in self.intrinsics.iter().enumerate() {
            let k_t = k.map(|e| T::from_f64(e).unwrap());
            let (rvec, tvec) = &poses[ci];
            let rot = rotation_from_rvec(rvec);
            for p in &points {
                let pc = &rot * p + tvec;
                let uv = project_pinhole_k(&k_t, &pc);
                out[idx] = T::from_f64(self.observed[idx]).unwrap() - uv.x.clone();
                out[idx + 1] = T::from_f64(self.observed[idx + 1]).unwrap() - uv.y.clone();
                idx += 2;
            }
        }
        out
    }

    /// Plain-`f64` evaluation, for cost reporting and tests.
    pub fn residual(&self, params: &DVector<f64>) -> DVector<f64> {
        self.residual_generic(params)
    }
}

impl<T: RealField> Factor<T> for ReprojectionResidual {
    fn residual_func(&self, params: &[DVector<T>]) -> DVector<T> {
        debug_assert_eq!(params.len(), 1, "expected a single flat parameter block");
        self.residual_generic(&params[0])
    }
}
