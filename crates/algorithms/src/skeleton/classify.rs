//! Voxel classification by foreground neighbour count

use arbor_core::raster::Raster;
use serde::{Deserialize, Serialize};

use crate::morphology::neighbour_count;

/// Role of a voxel in a skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoxelClass {
    Background,
    /// At most one foreground neighbour
    EndPoint,
    /// Exactly two foreground neighbours
    Slab,
    /// Three or more foreground neighbours
    Junction,
}

impl VoxelClass {
    /// Class for a foreground voxel with `neighbours` foreground neighbours
    pub fn from_neighbours(neighbours: usize) -> Self {
        match neighbours {
            0 | 1 => VoxelClass::EndPoint,
            2 => VoxelClass::Slab,
            _ => VoxelClass::Junction,
        }
    }

    /// Gray value used in tagged skeleton images
    pub fn tag(self) -> u8 {
        match self {
            VoxelClass::Background => 0,
            VoxelClass::EndPoint => 30,
            VoxelClass::Junction => 70,
            VoxelClass::Slab => 127,
        }
    }

    /// End-points and junctions terminate branches
    pub fn is_node(self) -> bool {
        matches!(self, VoxelClass::EndPoint | VoxelClass::Junction)
    }
}

/// Tag every foreground voxel with its class gray value
pub fn tag_skeleton(raster: &Raster<u8>) -> Raster<u8> {
    let mut tagged = raster.with_same_meta::<u8>();
    for v in raster.foreground() {
        let class = VoxelClass::from_neighbours(neighbour_count(raster, v));
        tagged.put(v, class.tag());
    }
    tagged
}
