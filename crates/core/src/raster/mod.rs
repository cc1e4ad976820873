//! Raster data structures and operations

mod calibration;
mod element;
mod grid;
mod neighborhood;

pub use calibration::Calibration;
pub use element::RasterElement;
pub use grid::Raster;
pub use neighborhood::{Connectivity, Rect, Voxel};
