//! Mathematical utilities and type definitions.
//!
//! This module provides the fundamental types used throughout the library
//! together with rotation-vector and homogeneous-transform helpers.

use nalgebra::{Matrix3, Matrix4, Point2, Point3, Vector2, Vector3};

pub mod projection;
pub mod rotation;

pub use projection::{project_pinhole_k, PROJECTION_EPS};
pub use rotation::{
    invert_homogeneous, relative_transform, rotation_from_rvec, rvec_from_rotation,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
