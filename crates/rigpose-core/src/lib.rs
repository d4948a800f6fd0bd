//! Core math and data model for `rigpose`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...),
//! - rotation-vector (Rodrigues) and homogeneous-transform helpers,
//! - pinhole projection through a full 3×3 intrinsic matrix,
//! - canonical checkerboard corner generation,
//! - the calibration data model (cameras, observations, rigid poses),
//! - rig instance configuration types,
//! - synthetic rig generation for tests.
//!
//! Everything here is pure data and math; filesystem access and the
//! optimization machinery live in `rigpose-pipeline` and `rigpose-optim`.

/// Rig instance configuration types.
pub mod config;
/// Linear algebra type aliases and transform helpers.
pub mod math;
/// Calibration data model.
pub mod models;
/// Synthetic rigs with exact observations, for tests.
pub mod synthetic;
/// Canonical checkerboard corner generation.
pub mod target;

pub use config::*;
pub use math::*;
pub use models::*;
pub use target::*;
