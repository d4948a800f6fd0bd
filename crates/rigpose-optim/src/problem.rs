//! Bundle problem driver: glue between the residual engine and the solver.

use anyhow::{ensure, Result};
use nalgebra::DVector;
use rigpose_core::{Extrinsic, Pt3};

use crate::residual::ReprojectionResidual;
use crate::solver::{BundleSolver, SolveOptions};

/// One rig bundle-adjustment problem: residual engine plus initial vector.
#[derive(Debug, Clone)]
pub struct RigBundleProblem {
    residual: ReprojectionResidual,
    initial: DVector<f64>,
}

/// Refined parameters in both flat and structured form.
#[derive(Debug, Clone)]
pub struct RigBundleSolution {
    /// Refined world → camera extrinsics, in camera order.
    pub extrinsics: Vec<Extrinsic>,
    /// Refined board points per time instant.
    pub instant_points: Vec<Vec<Pt3>>,
    /// The refined flat vector itself.
    pub params: DVector<f64>,
    /// `0.5 · ‖residual‖²` at the refined vector.
    pub final_cost: f64,
}

impl RigBundleProblem {
    /// Pair a residual engine with its initial parameter vector.
    pub fn new(residual: ReprojectionResidual, initial: DVector<f64>) -> Result<Self> {
        ensure!(
            initial.len() == residual.layout().param_len(),
            "initial vector length {} != layout parameter length {}",
            initial.len(),
            residual.layout().param_len()
        );
        Ok(Self { residual, initial })
    }

    /// The residual engine.
    pub fn residual(&self) -> &ReprojectionResidual {
        &self.residual
    }

    /// The initial parameter vector.
    pub fn initial(&self) -> &DVector<f64> {
        &self.initial
    }

    /// `0.5 · ‖residual‖²` at the initial vector.
    pub fn initial_cost(&self) -> f64 {
        0.5 * self.residual.residual(&self.initial).norm_squared()
    }

    /// Run the minimizer and unpack the refined vector.
    ///
    /// This is the single blocking call of a calibration run; it iterates
    /// internally until convergence or the iteration budget in `opts`.
    pub fn solve(&self, solver: &dyn BundleSolver, opts: &SolveOptions) -> Result<RigBundleSolution> {
        let refined = solver.minimize(&self.residual, self.initial.clone(), opts)?;
        ensure!(
            refined.len() == self.residual.layout().param_len(),
            "solver returned a vector of length {}, expected {}",
            refined.len(),
            self.residual.layout().param_len()
        );

        let final_cost = 0.5 * self.residual.residual(&refined).norm_squared();
        let (extrinsics, instant_points) = self.residual.layout().unflatten_structured(&refined);
        Ok(RigBundleSolution {
            extrinsics,
            instant_points,
            params: refined,
            final_cost,
        })
    }
}
