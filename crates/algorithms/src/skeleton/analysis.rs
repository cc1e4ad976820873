//! Skeleton analysis: trees, branches, junctions and loop resolution

use arbor_core::raster::{Raster, RasterElement, Voxel};
use arbor_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classify::VoxelClass;
use super::cycles::find_cycles;
use super::graph::{Branch, NodeKind, VoxelGraph};
use super::loops::{choose_cut, LoopPolicy};

/// Parameters for skeleton analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonParams {
    /// How cycles are broken before measuring
    pub loop_policy: LoopPolicy,
}

/// Skeleton analysis algorithm
#[derive(Debug, Clone, Default)]
pub struct AnalyzeSkeleton;

impl Algorithm for AnalyzeSkeleton {
    type Input = Raster<u8>;
    type Output = SkeletonAnalysis;
    type Params = SkeletonParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "AnalyzeSkeleton"
    }

    fn description(&self) -> &'static str {
        "Decompose a skeleton into trees, branches and junctions"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        analyse_skeleton(&input, &params, None)
    }
}

/// Measurements of one connected component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tree {
    pub branches: usize,
    pub endpoints: usize,
    /// Junction clusters
    pub junctions: usize,
    pub junction_voxels: usize,
    pub slabs: usize,
    pub triples: usize,
    pub quadruples: usize,
    /// Branch lengths in enumeration order
    pub branch_lengths: Vec<f64>,
    /// NaN when the tree has no branch
    pub average_branch_length: f64,
    pub max_branch_length: f64,
    pub voxels: usize,
}

/// Adjacent junction voxels acting as one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JunctionCluster {
    /// First member in scan order
    pub representative: Voxel,
    pub voxels: Vec<Voxel>,
    /// Distinct branches attached to the cluster
    pub branches: usize,
    pub tree: usize,
}

/// Result of [`analyse_skeleton`]
#[derive(Debug, Clone)]
pub struct SkeletonAnalysis {
    pub trees: Vec<Tree>,
    pub endpoints: Vec<Voxel>,
    pub junction_voxels: Vec<Voxel>,
    pub junctions: Vec<JunctionCluster>,
    pub branches: Vec<Branch>,
    /// Voxels deleted to break cycles, in deletion order
    pub cut_voxels: Vec<Voxel>,
    /// Cycles still present in `skeleton`
    pub unresolved_loops: usize,
    /// The analysed skeleton after loop resolution
    pub skeleton: Raster<u8>,
}

impl SkeletonAnalysis {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_branches(&self) -> usize {
        self.branches.len()
    }

    pub fn n_endpoints(&self) -> usize {
        self.endpoints.len()
    }

    pub fn n_junctions(&self) -> usize {
        self.junctions.len()
    }

    pub fn n_triples(&self) -> usize {
        self.trees.iter().map(|t| t.triples).sum()
    }

    pub fn n_quadruples(&self) -> usize {
        self.trees.iter().map(|t| t.quadruples).sum()
    }

    pub fn cycles_resolved(&self) -> usize {
        self.cut_voxels.len()
    }

    /// Mean over trees with at least one branch of their average branch
    /// length. NaN when no tree has a branch.
    pub fn mean_branch_length(&self) -> f64 {
        let averages: Vec<f64> = self
            .trees
            .iter()
            .filter(|t| t.branches > 0)
            .map(|t| t.average_branch_length)
            .collect();
        if averages.is_empty() {
            return f64::NAN;
        }
        averages.iter().sum::<f64>() / averages.len() as f64
    }

    /// Longest branch over the whole skeleton, 0 without branches
    pub fn max_branch_length(&self) -> f64 {
        self.branches.iter().map(|b| b.length).fold(0.0, f64::max)
    }
}

/// Check an intensity raster against a loop policy and the skeleton shape
pub fn validate_intensity<T: RasterElement>(
    skeleton: &Raster<T>,
    policy: LoopPolicy,
    intensity: Option<&Raster<u8>>,
) -> Result<()> {
    if !policy.needs_intensity() {
        return Ok(());
    }
    match intensity {
        None => Err(Error::InvalidParameter {
            name: "intensity",
            value: "none".into(),
            reason: format!("loop policy {:?} needs an intensity image", policy),
        }),
        Some(image) if image.shape() != skeleton.shape() => Err(Error::SizeMismatch {
            expected: skeleton.shape(),
            actual: image.shape(),
        }),
        Some(_) => Ok(()),
    }
}

/// Analyse a binary skeleton.
///
/// Cycles are broken according to `params.loop_policy` in rounds: each
/// round deletes one voxel per independent cycle and re-enumerates the
/// graph. The returned counts describe the skeleton after resolution.
///
/// # Arguments
/// * `raster` - Skeleton image, any non-zero voxel is foreground
/// * `params` - Loop resolution policy
/// * `intensity` - Grayscale image of the same shape, for intensity policies
pub fn analyse_skeleton<T: RasterElement>(
    raster: &Raster<T>,
    params: &SkeletonParams,
    intensity: Option<&Raster<u8>>,
) -> Result<SkeletonAnalysis> {
    if raster.is_empty() {
        let (width, height, depth) = raster.shape();
        return Err(Error::InvalidDimensions {
            width,
            height,
            depth,
        });
    }
    validate_intensity(raster, params.loop_policy, intensity)?;

    let mut skeleton = raster.binarize(255);
    let mut cut_voxels = Vec::new();
    let mut graph = VoxelGraph::build(&skeleton);
    let mut cycles = find_cycles(graph.nodes.len(), &graph.branches);
    let max_rounds = cycles.len();
    let mut round = 0;

    while !cycles.is_empty() && params.loop_policy != LoopPolicy::None && round < max_rounds {
        let mut cut_branches: Vec<usize> = Vec::new();
        let mut cuts = Vec::new();
        for cycle in &cycles {
            if cycle.iter().any(|b| cut_branches.contains(b)) {
                continue;
            }
            if let Some((b, voxel)) = choose_cut(params.loop_policy, cycle, &graph.branches, intensity) {
                cut_branches.push(b);
                cuts.push(voxel);
            }
        }
        if cuts.is_empty() {
            break;
        }

        debug!(round, cycles = cycles.len(), cuts = cuts.len(), "loop resolution round");
        for &voxel in &cuts {
            skeleton.put(voxel, 0);
        }
        cut_voxels.extend(cuts);

        graph = VoxelGraph::build(&skeleton);
        cycles = find_cycles(graph.nodes.len(), &graph.branches);
        round += 1;
    }

    Ok(summarize_graph(graph, skeleton, cut_voxels, cycles.len()))
}

fn summarize_graph(
    graph: VoxelGraph,
    skeleton: Raster<u8>,
    cut_voxels: Vec<Voxel>,
    unresolved_loops: usize,
) -> SkeletonAnalysis {
    let mut trees = vec![Tree::default(); graph.n_trees];

    for (i, class) in graph.class.iter().enumerate() {
        let tree = &mut trees[graph.tree_of[i]];
        tree.voxels += 1;
        match class {
            VoxelClass::EndPoint => tree.endpoints += 1,
            VoxelClass::Junction => tree.junction_voxels += 1,
            VoxelClass::Slab => tree.slabs += 1,
            VoxelClass::Background => {}
        }
    }

    for branch in &graph.branches {
        let tree = &mut trees[branch.tree];
        tree.branches += 1;
        tree.branch_lengths.push(branch.length);
        tree.max_branch_length = tree.max_branch_length.max(branch.length);
    }

    let mut junctions = Vec::with_capacity(graph.clusters.len());
    for (c, members) in graph.clusters.iter().enumerate() {
        let node = graph.cluster_node[c];
        debug_assert_eq!(graph.nodes[node].kind, NodeKind::Junction);
        let degree = graph.degree(node);
        let tree_id = graph.nodes[node].tree;
        let tree = &mut trees[tree_id];
        tree.junctions += 1;
        match degree {
            3 => tree.triples += 1,
            4 => tree.quadruples += 1,
            _ => {}
        }
        junctions.push(JunctionCluster {
            representative: graph.nodes[node].voxel,
            voxels: members.iter().map(|&i| graph.voxels[i]).collect(),
            branches: degree,
            tree: tree_id,
        });
    }

    for tree in &mut trees {
        tree.average_branch_length = if tree.branches > 0 {
            tree.branch_lengths.iter().sum::<f64>() / tree.branches as f64
        } else {
            f64::NAN
        };
    }

    let pick = |wanted: VoxelClass| -> Vec<Voxel> {
        graph
            .class
            .iter()
            .zip(&graph.voxels)
            .filter(|(c, _)| **c == wanted)
            .map(|(_, &v)| v)
            .collect()
    };
    let endpoints = pick(VoxelClass::EndPoint);
    let junction_voxels = pick(VoxelClass::Junction);

    SkeletonAnalysis {
        trees,
        endpoints,
        junction_voxels,
        junctions,
        branches: graph.branches,
        cut_voxels,
        unresolved_loops,
        skeleton,
    }
}
