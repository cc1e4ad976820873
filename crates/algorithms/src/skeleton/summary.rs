//! Whole-image skeleton summary

use arbor_core::raster::Raster;
use arbor_core::{Error, Result};
use serde::{Deserialize, Serialize};

use super::analysis::{analyse_skeleton, SkeletonAnalysis, SkeletonParams};

/// Aggregate measurements of a branched skeleton
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonSummary {
    pub unit: String,
    /// Sum over trees of average branch length times branch count
    pub total_length: f64,
    pub max_branch_length: f64,
    /// Mean of per-tree average branch lengths
    pub mean_branch_length: f64,
    pub trees: usize,
    pub branches: usize,
    pub junctions: usize,
    pub endpoints: usize,
    pub triple_points: usize,
    pub quadruple_points: usize,
    pub voxels: usize,
}

/// Summarize an already computed analysis.
///
/// Fails when the image is not a branched skeleton: no branch at all and
/// at most one tree.
pub fn summarize_analysis(analysis: &SkeletonAnalysis) -> Result<SkeletonSummary> {
    if analysis.n_branches() == 0 && analysis.n_trees() <= 1 {
        return Err(Error::Algorithm(
            "image does not seem to be a branched skeleton".into(),
        ));
    }

    let total_length = analysis
        .trees
        .iter()
        .filter(|t| t.branches > 0)
        .map(|t| t.average_branch_length * t.branches as f64)
        .sum();

    Ok(SkeletonSummary {
        unit: analysis.skeleton.calibration().unit.clone(),
        total_length,
        max_branch_length: analysis.max_branch_length(),
        mean_branch_length: analysis.mean_branch_length(),
        trees: analysis.n_trees(),
        branches: analysis.n_branches(),
        junctions: analysis.n_junctions(),
        endpoints: analysis.n_endpoints(),
        triple_points: analysis.n_triples(),
        quadruple_points: analysis.n_quadruples(),
        voxels: analysis.trees.iter().map(|t| t.voxels).sum(),
    })
}

/// Analyse a skeleton and summarize it
pub fn summarize_skeleton(raster: &Raster<u8>, params: &SkeletonParams) -> Result<SkeletonSummary> {
    let analysis = analyse_skeleton(raster, params, None)?;
    summarize_analysis(&analysis)
}
