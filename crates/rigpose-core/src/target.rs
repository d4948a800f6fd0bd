//! Canonical checkerboard corner generation.

use serde::{Deserialize, Serialize};

use crate::math::{Pt3, Real, Vec3};

/// Checkerboard geometry in board-local terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardSpec {
    /// Inner-corner count along the detector's fast (inner) axis.
    pub cols: usize,
    /// Inner-corner count along the detector's slow (outer) axis.
    pub rows: usize,
    /// Physical square edge length; fixes the unit of every translation the
    /// PnP step and the bundle adjustment produce.
    pub square_edge: Real,
    /// Offset from the reference-frame origin to the board center.
    pub offset: Vec3,
    /// Selects the plane embedding: points varying in X/Y of the output frame
    /// when set, Y/Z otherwise. Rig geometry decides this, so it is
    /// configurable rather than hard-coded.
    pub swap_xz: bool,
}

/// Generate the ordered canonical 3D corner list for a board.
///
/// Iteration is row-major (rows outer, cols inner) to match the corner
/// ordering produced by the external detector. That ordering is a contract
/// with the detector, not a free choice; changing it silently corrupts every
/// 2D–3D correspondence downstream.
///
/// The grid is centered on (and therefore symmetric about) `spec.offset`.
pub fn board_points(spec: &BoardSpec) -> Vec<Pt3> {
    let w = spec.cols as Real;
    let h = spec.rows as Real;
    let mut points = Vec::with_capacity(spec.cols * spec.rows);
    for y in 0..spec.rows {
        for x in 0..spec.cols {
            let u = (x as Real - w / 2.0 + 0.5) * spec.square_edge;
            let v = (y as Real - h / 2.0 + 0.5) * spec.square_edge;
            let p = if spec.swap_xz {
                Pt3::new(-u, v, 0.0)
            } else {
                Pt3::new(0.0, -u, v)
            };
            points.push(p + spec.offset);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(swap_xz: bool) -> BoardSpec {
        BoardSpec {
            cols: 3,
            rows: 3,
            square_edge: 0.1,
            offset: Vec3::zeros(),
            swap_xz,
        }
    }

    #[test]
    fn point_count_and_row_major_order() {
        let pts = board_points(&spec(true));
        assert_eq!(pts.len(), 9);
        // First row varies along the inner (x) axis only.
        assert!((pts[0].x - 0.1).abs() < 1e-12);
        assert!((pts[1].x - 0.0).abs() < 1e-12);
        assert!((pts[2].x + 0.1).abs() < 1e-12);
        assert!((pts[0].y - pts[2].y).abs() < 1e-12);
        // Second row advances along the outer (y) axis.
        assert!((pts[3].y - pts[0].y - 0.1).abs() < 1e-12);
    }

    #[test]
    fn swap_flag_selects_plane_embedding() {
        for p in board_points(&spec(true)) {
            assert_eq!(p.z, 0.0, "swapped board must lie in the X/Y plane");
        }
        for p in board_points(&spec(false)) {
            assert_eq!(p.x, 0.0, "unswapped board must lie in the Y/Z plane");
        }
    }

    #[test]
    fn grid_is_symmetric_about_offset() {
        let offset = Vec3::new(0.5, -1.0, 2.0);
        let mut s = spec(true);
        s.offset = offset;
        let pts = board_points(&s);
        let centroid = pts.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords) / pts.len() as Real;
        assert!((centroid - offset).norm() < 1e-12, "centroid {centroid:?}");
    }

    #[test]
    fn even_dimensions_stay_centered() {
        let s = BoardSpec {
            cols: 4,
            rows: 2,
            square_edge: 0.05,
            offset: Vec3::zeros(),
            swap_xz: true,
        };
        let pts = board_points(&s);
        assert_eq!(pts.len(), 8);
        let centroid = pts.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords) / 8.0;
        assert!(centroid.norm() < 1e-12);
    }
}
