//! Bundle-adjustment machinery for rig pose calibration, built on tiny-solver.
//!
//! The pieces fit together as follows: [`ParamLayout`] is the single source
//! of truth for the flat parameter vector shared by the residual engine and
//! the solver; [`ReprojectionResidual`] turns a parameter vector into signed
//! reprojection differences; [`RigBundleProblem`] is the glue that hands both
//! to a [`BundleSolver`] and unpacks the refined vector.

pub mod params;
pub mod problem;
pub mod residual;
pub mod solver;

pub use params::ParamLayout;
pub use problem::{RigBundleProblem, RigBundleSolution};
pub use residual::ReprojectionResidual;
pub use solver::{BundleSolver, SolveOptions, TinySolverBundle};
