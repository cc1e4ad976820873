//! # Arbor Algorithms
//!
//! Skeleton analysis algorithms for arbor.
//!
//! ## Available Algorithm Categories
//!
//! - **morphology**: Topology-preserving thinning, isolated voxel erosion
//! - **skeleton**: Voxel classification, branch graph, loop resolution, summaries
//! - **strahler**: Iterative Strahler order labelling and per-order statistics
//! - **synthetic**: Fractal tree images for demos and benchmarks

pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod skeleton;
pub mod strahler;
pub mod synthetic;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::morphology::{erode_isolated, skeletonize, thin, Skeletonize, ThinningParams};
    pub use crate::skeleton::{
        analyse_skeleton, summarize_skeleton, tag_skeleton, AnalyzeSkeleton, LoopPolicy,
        SkeletonAnalysis, SkeletonParams, SkeletonSummary, VoxelClass,
    };
    pub use crate::strahler::{
        analyse_strahler, threshold_order, Diagnostic, OrderRecord, Report, Strahler,
        StrahlerInput, StrahlerParams, StrahlerResult,
    };
    pub use crate::synthetic::{fractal_tree, fractal_tree_stack, FractalTreeParams};
    pub use arbor_core::prelude::*;
}
