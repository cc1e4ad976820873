//! Isolated voxel erosion
//!
//! Thinning can leave single voxels with no foreground neighbour behind.
//! They would otherwise be reported as single-point trees.

use arbor_core::raster::{Raster, Voxel};

use super::topology::neighbour_count;

/// Remove every foreground voxel with zero foreground neighbours.
///
/// Returns the number of voxels removed.
pub fn erode_isolated(raster: &mut Raster<u8>) -> usize {
    let isolated: Vec<Voxel> = raster
        .foreground()
        .into_iter()
        .filter(|&v| neighbour_count(raster, v) == 0)
        .collect();

    for &v in &isolated {
        raster.put(v, 0);
    }
    isolated.len()
}
