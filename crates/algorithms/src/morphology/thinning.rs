//! Topology-preserving thinning of binary rasters
//!
//! Directional thinning after Lee, Kashyap & Chu (1994). Each pass runs one
//! sub-iteration per border direction; a voxel is a candidate when it is
//! foreground, exposed to the background on that side, not an end-point and
//! simple. Candidates are then removed one at a time, re-checking the
//! conditions against the partially thinned image, so two candidates on
//! opposite sides of a two-voxel slab can never both disappear.

use crate::maybe_rayon::*;
use arbor_core::raster::{Raster, RasterElement, Voxel};
use arbor_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::isolated::erode_isolated;
use super::topology::Cube;

/// Parameters for skeletonization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinningParams {
    /// Remove voxels left without any foreground neighbour
    pub erode_isolated: bool,
}

impl Default for ThinningParams {
    fn default() -> Self {
        Self {
            erode_isolated: true,
        }
    }
}

/// Skeletonization algorithm
#[derive(Debug, Clone, Default)]
pub struct Skeletonize;

impl Algorithm for Skeletonize {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = ThinningParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Skeletonize"
    }

    fn description(&self) -> &'static str {
        "Topology-preserving 3D thinning to a one-voxel-wide skeleton"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        skeletonize(&input, &params)
    }
}

/// Border direction: the face neighbour that must be background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Border {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Border {
    const PLANAR: [Border; 4] = [Border::North, Border::South, Border::East, Border::West];
    const ALL: [Border; 6] = [
        Border::North,
        Border::South,
        Border::East,
        Border::West,
        Border::Up,
        Border::Down,
    ];

    fn offset(self) -> (isize, isize, isize) {
        match self {
            Border::North => (0, -1, 0),
            Border::South => (0, 1, 0),
            Border::East => (1, 0, 0),
            Border::West => (-1, 0, 0),
            Border::Up => (0, 0, -1),
            Border::Down => (0, 0, 1),
        }
    }
}

fn is_deletable(cube: &Cube) -> bool {
    cube.neighbours() > 1 && cube.is_simple()
}

/// Thin a binary raster in place until a full pass removes nothing.
///
/// Returns the number of voxels removed. Single-slice rasters are thinned
/// with the four in-plane directions only.
pub fn thin(raster: &mut Raster<u8>) -> usize {
    let directions: &[Border] = if raster.is_3d() {
        &Border::ALL
    } else {
        &Border::PLANAR
    };

    let mut total = 0;
    let mut passes = 0;
    loop {
        let mut removed = 0;
        for &dir in directions {
            let (dx, dy, dz) = dir.offset();
            let candidates: Vec<Voxel> = {
                let current: &Raster<u8> = raster;
                current
                    .foreground()
                    .into_par_iter()
                    .filter(|&v| {
                        let cube = Cube::gather(current, v);
                        !cube.is_set(dx, dy, dz) && is_deletable(&cube)
                    })
                    .collect()
            };

            for v in candidates {
                if is_deletable(&Cube::gather(raster, v)) {
                    raster.put(v, 0);
                    removed += 1;
                }
            }
        }
        passes += 1;
        total += removed;
        if removed == 0 {
            break;
        }
    }

    debug!(passes, removed = total, "thinning finished");
    total
}

/// Binarize, thin and optionally erode isolated voxels.
///
/// The input is not modified; foreground voxels of the result are 255.
pub fn skeletonize<T: RasterElement>(raster: &Raster<T>, params: &ThinningParams) -> Result<Raster<u8>> {
    if raster.is_empty() {
        let (width, height, depth) = raster.shape();
        return Err(Error::InvalidDimensions {
            width,
            height,
            depth,
        });
    }

    let mut skeleton = raster.binarize(255);
    thin(&mut skeleton);
    if params.erode_isolated {
        erode_isolated(&mut skeleton);
    }
    Ok(skeleton)
}
