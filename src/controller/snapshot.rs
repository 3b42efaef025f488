//! The persisted part of a viewport: zoom and center. Everything else is session state.

use bevy_math::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Zoom and center of a viewport, as written into a save file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportSnapshot {
    pub zoom_level: f64,
    pub center: [f64; 2],
}

/// A [`ViewportSnapshot`] that cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SnapshotError {
    #[error("saved zoom level {0} is not a finite positive number")]
    InvalidZoom(f64),
    #[error("saved center ({0}, {1}) is not finite")]
    InvalidCenter(f64, f64),
}

impl ViewportSnapshot {
    pub fn new(zoom_level: f64, center: DVec2) -> Self {
        Self {
            zoom_level,
            center: center.to_array(),
        }
    }

    pub fn center(&self) -> DVec2 {
        DVec2::from_array(self.center)
    }

    /// Check that the snapshot describes a usable view.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if !self.zoom_level.is_finite() || self.zoom_level <= 0.0 {
            return Err(SnapshotError::InvalidZoom(self.zoom_level));
        }
        let [x, y] = self.center;
        if !x.is_finite() || !y.is_finite() {
            return Err(SnapshotError::InvalidCenter(x, y));
        }
        Ok(())
    }
}
