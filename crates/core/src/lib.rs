//! # Arbor Core
//!
//! Core types, traits and I/O for the arbor skeleton-analysis library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic 2D/3D voxel grid with spatial calibration
//! - `Calibration`: Per-axis voxel spacing and unit label
//! - `Voxel`, `Rect` and neighbourhood offsets for grid traversal
//! - Algorithm traits for consistent API
//! - I/O for single and multi-page TIFF stacks

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{Calibration, Connectivity, Raster, RasterElement, Rect, Voxel};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{Calibration, Connectivity, Raster, RasterElement, Rect, Voxel};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in arbor.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
