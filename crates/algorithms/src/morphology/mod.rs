//! Binary morphology for skeleton extraction
//!
//! - **Thinning**: directional topology-preserving thinning (2D and 3D)
//! - **Isolated erosion**: removal of voxels without foreground neighbours
//! - **Topology**: simple-point test on the 3x3x3 neighbourhood

mod isolated;
mod thinning;
pub(crate) mod topology;

pub use isolated::erode_isolated;
pub use thinning::{skeletonize, thin, Skeletonize, ThinningParams};
pub use topology::{neighbour_count, Cube};
