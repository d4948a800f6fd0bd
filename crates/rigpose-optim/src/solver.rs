//! Solver abstraction over the external nonlinear least-squares minimizer.
//!
//! The minimizer is an opaque capability: given a residual function and an
//! initial vector it returns a refined vector minimizing the squared residual
//! norm. Production runs use tiny-solver's Levenberg–Marquardt optimizer,
//! which performs Jacobian-based parameter scaling internally; no damping,
//! stopping, or trust-region logic is implemented here.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};
use tiny_solver::problem::Problem;
use tiny_solver::LevenbergMarquardtOptimizer;

use crate::residual::ReprojectionResidual;

/// Name of the single flat parameter block handed to tiny-solver.
const PARAM_BLOCK: &str = "rig";

/// Options mapped onto the external minimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Hard iteration budget. The solve is a single blocking call and the
    /// minimizer may not bound itself, so the budget is not optional.
    pub max_iters: usize,
    /// Relative cost-decrease threshold treated as convergence.
    pub rel_tol: f64,
    /// Verbosity level passed through to the minimizer.
    pub verbosity: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            rel_tol: 1e-8,
            verbosity: 0,
        }
    }
}

/// Capability interface for the external least-squares minimizer.
///
/// Kept narrow so the optimizer driver can be exercised with deterministic
/// fakes independent of any particular optimization library.
pub trait BundleSolver {
    /// Refine `initial` to locally minimize the squared residual norm.
    fn minimize(
        &self,
        residual: &ReprojectionResidual,
        initial: DVector<f64>,
        opts: &SolveOptions,
    ) -> Result<DVector<f64>>;
}

/// tiny-solver Levenberg–Marquardt backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TinySolverBundle;

impl BundleSolver for TinySolverBundle {
    fn minimize(
        &self,
        residual: &ReprojectionResidual,
        initial: DVector<f64>,
        opts: &SolveOptions,
    ) -> Result<DVector<f64>> {
        let layout = residual.layout();

        let mut problem = Problem::new();
        let factor: Box<dyn tiny_solver::factors::FactorImpl + Send> =
            Box::new(residual.clone());
        problem.add_residual_block(layout.residual_len(), &[PARAM_BLOCK], factor, None);

        let mut initial_map = HashMap::new();
        initial_map.insert(PARAM_BLOCK.to_string(), initial);

        let optimizer = LevenbergMarquardtOptimizer::default();
        let options = to_optimizer_options(opts);
        let mut solution = optimizer
            .optimize(&problem, &initial_map, Some(options))
            .ok_or_else(|| anyhow!("tiny-solver failed to converge"))?;

        solution
            .remove(PARAM_BLOCK)
            .ok_or_else(|| anyhow!("solver output missing parameter block '{PARAM_BLOCK}'"))
    }
}

fn to_optimizer_options(opts: &SolveOptions) -> OptimizerOptions {
    let mut options = OptimizerOptions::default();
    options.max_iteration = opts.max_iters;
    options.verbosity_level = opts.verbosity;
    options.min_rel_error_decrease_threshold = opts.rel_tol;
    options
}
