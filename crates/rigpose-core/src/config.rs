//! Rig instance configuration.
//!
//! The instance file enumerates rig components (entries carrying a camera
//! type are cameras; each camera owns a directory named after its id) and
//! the checkerboard used for calibration. Field names follow the external
//! instance format, which this crate consumes but does not own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::Vec3;
use crate::target::BoardSpec;

/// Checkerboard description from the rig instance file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerboardConfig {
    /// Inner-corner count along the first board axis.
    #[serde(rename = "X")]
    pub x: usize,
    /// Inner-corner count along the second board axis.
    #[serde(rename = "Y")]
    pub y: usize,
    /// Square edge length in meters.
    #[serde(rename = "SquareEdge_m")]
    pub square_edge_m: f64,
    /// Offset from the reference-frame origin to the board center, in meters.
    #[serde(rename = "TransFromOrigin_m")]
    pub trans_from_origin_m: [f64; 3],
    /// Plane embedding selector, see [`BoardSpec::swap_xz`].
    #[serde(rename = "SwapXZ")]
    pub swap_xz: bool,
}

/// One rig component. Only entries with a camera type take part in the
/// calibration; other component kinds are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Camera type tag; present on camera components only.
    #[serde(rename = "CamType", default, skip_serializing_if = "Option::is_none")]
    pub cam_type: Option<String>,
}

/// Rig instance description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// Components keyed by id. A `BTreeMap` keeps camera order deterministic
    /// across runs.
    #[serde(rename = "Components")]
    pub components: BTreeMap<String, ComponentConfig>,
    /// Checkerboard used for this calibration.
    #[serde(rename = "Checkerboard")]
    pub checkerboard: CheckerboardConfig,
}

/// Malformed rig configuration; fatal for the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The instance lists no camera components.
    #[error("rig configuration lists no camera components")]
    NoCameras,
    /// Non-positive corner counts.
    #[error("checkerboard inner-corner counts must be positive, got {x}x{y}")]
    BadBoardDims { x: usize, y: usize },
    /// Non-positive square edge.
    #[error("checkerboard square edge must be positive, got {0}")]
    BadSquareEdge(f64),
}

impl RigConfig {
    /// Ids of camera components, in deterministic (lexical) order.
    pub fn camera_ids(&self) -> Vec<String> {
        self.components
            .iter()
            .filter(|(_, c)| c.cam_type.is_some())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Check the configuration is usable for a calibration run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera_ids().is_empty() {
            return Err(ConfigError::NoCameras);
        }
        let cb = &self.checkerboard;
        if cb.x == 0 || cb.y == 0 {
            return Err(ConfigError::BadBoardDims { x: cb.x, y: cb.y });
        }
        if cb.square_edge_m <= 0.0 {
            return Err(ConfigError::BadSquareEdge(cb.square_edge_m));
        }
        Ok(())
    }

    /// Board geometry implied by the checkerboard section.
    pub fn board_spec(&self) -> BoardSpec {
        let cb = &self.checkerboard;
        BoardSpec {
            cols: cb.x,
            rows: cb.y,
            square_edge: cb.square_edge_m,
            offset: Vec3::from(cb.trans_from_origin_m),
            swap_xz: cb.swap_xz,
        }
    }
}
