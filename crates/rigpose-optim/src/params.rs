//! Flat parameter vector layout.
//!
//! The optimizer sees one flat vector: all camera extrinsics (6 scalars each,
//! `[rvec | tvec]`, in camera order) followed by all per-instant 3D points
//! (instant-major, point-major, 3 scalars each). [`ParamLayout`] owns that
//! layout; the residual engine and the solver both go through it rather than
//! duplicating offsets.

use anyhow::{ensure, Result};
use nalgebra::{DVector, RealField, Vector3};
use rigpose_core::{Extrinsic, Pt3};

/// Dimensions of one calibration run's parameter vector.
///
/// Fixed for the lifetime of the run: camera count, time-instant count and
/// points per instant never change once the observations are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    /// Number of physical cameras (`C`).
    pub num_cameras: usize,
    /// Number of time instants (`I`).
    pub num_instants: usize,
    /// Canonical board corner count (`|BoardPoint|`).
    pub points_per_instant: usize,
}

impl ParamLayout {
    /// Length of the flat parameter vector: `6·C + 3·I·|BoardPoint|`.
    pub fn param_len(&self) -> usize {
        6 * self.num_cameras + 3 * self.pooled_points()
    }

    /// Length of the residual vector: `2·C·I·|BoardPoint|`.
    pub fn residual_len(&self) -> usize {
        2 * self.num_cameras * self.pooled_points()
    }

    /// Total 3D points pooled over all instants: `I·|BoardPoint|`.
    pub fn pooled_points(&self) -> usize {
        self.num_instants * self.points_per_instant
    }

    /// Flatten structured extrinsics and per-instant points into one vector.
    pub fn flatten(
        &self,
        extrinsics: &[Extrinsic],
        instant_points: &[Vec<Pt3>],
    ) -> Result<DVector<f64>> {
        ensure!(
            extrinsics.len() == self.num_cameras,
            "extrinsic count {} != camera count {}",
            extrinsics.len(),
            self.num_cameras
        );
        ensure!(
            instant_points.len() == self.num_instants,
            "instant count {} != expected {}",
            instant_points.len(),
            self.num_instants
        );

        let mut v = DVector::zeros(self.param_len());
        for (ci, e) in extrinsics.iter().enumerate() {
            let base = 6 * ci;
            v.fixed_rows_mut::<3>(base).copy_from(&e.rvec);
            v.fixed_rows_mut::<3>(base + 3).copy_from(&e.tvec);
        }

        let mut base = 6 * self.num_cameras;
        for (ii, points) in instant_points.iter().enumerate() {
            ensure!(
                points.len() == self.points_per_instant,
                "instant {} has {} points, expected {}",
                ii,
                points.len(),
                self.points_per_instant
            );
            for p in points {
                v.fixed_rows_mut::<3>(base).copy_from(&p.coords);
                base += 3;
            }
        }
        Ok(v)
    }

    /// Split a flat vector into per-camera `(rvec, tvec)` pairs and the
    /// pooled 3D points (instant-major, matching [`Self::flatten`]).
    ///
    /// Generic over the scalar so the residual engine can unflatten
    /// dual-number vectors during automatic differentiation. Exact inverse of
    /// [`Self::flatten`] for `f64`.
    pub fn unflatten<T: RealField>(
        &self,
        v: &DVector<T>,
    ) -> (Vec<(Vector3<T>, Vector3<T>)>, Vec<Vector3<T>>) {
        assert_eq!(
            v.len(),
            self.param_len(),
            "parameter vector length does not match layout"
        );

        let poses = (0..self.num_cameras)
            .map(|ci| {
                let base = 6 * ci;
                (
                    Vector3::new(v[base].clone(), v[base + 1].clone(), v[base + 2].clone()),
                    Vector3::new(v[base + 3].clone(), v[base + 4].clone(), v[base + 5].clone()),
                )
            })
            .collect();

        let offset = 6 * self.num_cameras;
        let points = (0..self.pooled_points())
            .map(|pi| {
                let base = offset + 3 * pi;
                Vector3::new(v[base].clone(), v[base + 1].clone(), v[base + 2].clone())
            })
            .collect();

        (poses, points)
    }

    /// `f64` convenience returning the structured representation.
    pub fn unflatten_structured(&self, v: &DVector<f64>) -> (Vec<Extrinsic>, Vec<Vec<Pt3>>) {
        let (poses, points) = self.unflatten(v);
        let extrinsics = poses
            .into_iter()
            .map(|(rvec, tvec)| Extrinsic { rvec, tvec })
            .collect();
        let instant_points = points
            .chunks(self.points_per_instant)
            .map(|chunk| chunk.iter().map(|p| Pt3::from(*p)).collect())
            .collect();
        (extrinsics, instant_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigpose_core::Vec3;

    fn layout() -> ParamLayout {
        ParamLayout {
            num_cameras: 2,
            num_instants: 3,
            points_per_instant: 4,
        }
    }

    fn structured() -> (Vec<Extrinsic>, Vec<Vec<Pt3>>) {
        let extrinsics = vec![
            Extrinsic {
                rvec: Vec3::new(0.1, 0.2, 0.3),
                tvec: Vec3::new(1.0, 2.0, 3.0),
            },
            Extrinsic {
                rvec: Vec3::new(-0.4, 0.5, -0.6),
                tvec: Vec3::new(-1.5, 0.25, 2.75),
            },
        ];
        let instant_points = (0..3)
            .map(|i| {
                (0..4)
                    .map(|j| Pt3::new(i as f64, j as f64 * 0.5, i as f64 - j as f64))
                    .collect()
            })
            .collect();
        (extrinsics, instant_points)
    }

    #[test]
    fn lengths_follow_layout() {
        let l = layout();
        assert_eq!(l.param_len(), 6 * 2 + 3 * 3 * 4);
        assert_eq!(l.residual_len(), 2 * 2 * 3 * 4);
        assert_eq!(l.pooled_points(), 12);
    }

    #[test]
    fn unflatten_is_exact_inverse_of_flatten() {
        let l = layout();
        let (extrinsics, instant_points) = structured();
        let v = l.flatten(&extrinsics, &instant_points).unwrap();
        assert_eq!(v.len(), l.param_len());

        let (e_back, p_back) = l.unflatten_structured(&v);
        assert_eq!(e_back, extrinsics);
        assert_eq!(p_back, instant_points);

        // And flattening again reproduces the vector bit for bit.
        let v_back = l.flatten(&e_back, &p_back).unwrap();
        assert_eq!(v_back, v);
    }

    #[test]
    fn extrinsics_occupy_the_vector_head() {
        let l = layout();
        let (extrinsics, instant_points) = structured();
        let v = l.flatten(&extrinsics, &instant_points).unwrap();
        assert_eq!(v[0], 0.1);
        assert_eq!(v[3], 1.0);
        assert_eq!(v[6], -0.4);
        // First pooled point right after the extrinsics block.
        assert_eq!(v[12], instant_points[0][0].x);
    }

    #[test]
    fn flatten_rejects_mismatched_shapes() {
        let l = layout();
        let (extrinsics, mut instant_points) = structured();
        assert!(l.flatten(&extrinsics[..1], &instant_points).is_err());

        instant_points[1].pop();
        assert!(l.flatten(&extrinsics, &instant_points).is_err());
    }

    #[test]
    #[should_panic(expected = "length does not match")]
    fn unflatten_panics_on_wrong_length() {
        let l = layout();
        let v = DVector::<f64>::zeros(l.param_len() + 1);
        let _ = l.unflatten(&v);
    }
}
