//! Skeleton graph analysis
//!
//! Decomposes a one-voxel-wide skeleton into:
//! - **Trees**: 26-connected components
//! - **Junction clusters**: adjacent voxels with three or more neighbours
//! - **Branches**: slab chains between end-points and junction clusters
//!
//! Cycles are broken by a configurable [`LoopPolicy`] before measuring.

mod analysis;
mod classify;
mod cycles;
mod graph;
mod loops;
mod summary;

pub use analysis::{
    analyse_skeleton, validate_intensity, AnalyzeSkeleton, JunctionCluster, SkeletonAnalysis,
    SkeletonParams, Tree,
};
pub use classify::{tag_skeleton, VoxelClass};
pub use graph::{path_length, Branch, Node, NodeKind};
pub use loops::LoopPolicy;
pub use summary::{summarize_analysis, summarize_skeleton, SkeletonSummary};
