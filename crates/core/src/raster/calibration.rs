//! Spatial calibration of voxel grids

use serde::{Deserialize, Serialize};

/// Physical voxel spacing along each axis, plus the unit it is expressed in.
///
/// Converts integer voxel steps into calibrated distances:
/// ```text
/// d = sqrt((dx * pixel_width)^2 + (dy * pixel_height)^2 + (dz * voxel_depth)^2)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Voxel size along X
    pub pixel_width: f64,
    /// Voxel size along Y
    pub pixel_height: f64,
    /// Voxel size along Z (slice spacing)
    pub voxel_depth: f64,
    /// Unit label, e.g. "um" or "pixel"
    pub unit: String,
}

impl Calibration {
    /// Create a calibration from per-axis spacing and a unit label
    pub fn new(pixel_width: f64, pixel_height: f64, voxel_depth: f64, unit: impl Into<String>) -> Self {
        Self {
            pixel_width,
            pixel_height,
            voxel_depth,
            unit: unit.into(),
        }
    }

    /// Isotropic calibration with the same spacing on all axes
    pub fn isotropic(spacing: f64, unit: impl Into<String>) -> Self {
        Self::new(spacing, spacing, spacing, unit)
    }

    /// Calibrated length of one step between neighbouring voxels.
    ///
    /// Deltas are voxel offsets, normally in {-1, 0, 1}.
    pub fn step_length(&self, dx: isize, dy: isize, dz: isize) -> f64 {
        let x = dx as f64 * self.pixel_width;
        let y = dy as f64 * self.pixel_height;
        let z = dz as f64 * self.voxel_depth;
        (x * x + y * y + z * z).sqrt()
    }

    /// Whether all axes share the same unit spacing of 1.0
    pub fn is_uncalibrated(&self) -> bool {
        self.pixel_width == 1.0 && self.pixel_height == 1.0 && self.voxel_depth == 1.0
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, "pixel")
    }
}
