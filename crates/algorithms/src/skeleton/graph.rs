//! Skeleton graph construction
//!
//! Foreground voxels become graph elements: end-points and junction
//! clusters are nodes, slab chains between them are branches. Everything is
//! enumerated in scan order so the graph is reproducible.

use std::collections::HashMap;

use arbor_core::raster::{Calibration, Connectivity, Raster, Voxel};
use serde::{Deserialize, Serialize};

use super::classify::VoxelClass;

/// Kind of graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    EndPoint,
    Junction,
    /// First voxel of a pure ring, which has no end-point or junction
    LoopAnchor,
}

/// Graph node: an end-point, a junction cluster or a ring anchor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// End-point voxel, cluster representative or anchor voxel
    pub voxel: Voxel,
    pub tree: usize,
}

/// Slab chain between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Node at the first voxel
    pub start: usize,
    /// Node at the last voxel
    pub end: usize,
    /// Ordered voxels, both terminal node voxels included
    pub voxels: Vec<Voxel>,
    /// Calibrated length along the chain
    pub length: f64,
    pub tree: usize,
}

impl Branch {
    /// Voxels strictly between the two terminals
    pub fn interior(&self) -> &[Voxel] {
        if self.voxels.len() < 2 {
            return &[];
        }
        &self.voxels[1..self.voxels.len() - 1]
    }

    /// Middle interior voxel, if the branch has one
    pub fn midpoint(&self) -> Option<Voxel> {
        let interior = self.interior();
        interior.get(interior.len() / 2).copied()
    }

    /// Whether both ends attach to the same node
    pub fn is_loop(&self) -> bool {
        self.start == self.end
    }
}

/// Calibrated length of a voxel path
pub fn path_length(voxels: &[Voxel], calibration: &Calibration) -> f64 {
    voxels
        .windows(2)
        .map(|w| {
            let (dx, dy, dz) = w[0].delta(&w[1]);
            calibration.step_length(dx, dy, dz)
        })
        .sum()
}

/// Union-Find over dense indices
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]]; // path halving
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; false if they were already joined
    pub(crate) fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }

        let (root, child) = if self.rank[ra] >= self.rank[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };

        self.parent[child] = root;
        if self.rank[root] == self.rank[child] {
            self.rank[root] += 1;
        }
        true
    }
}

/// Graph of one skeleton image, indexed by foreground position in scan order
pub(crate) struct VoxelGraph {
    pub voxels: Vec<Voxel>,
    pub class: Vec<VoxelClass>,
    pub neighbours: Vec<Vec<usize>>,
    pub tree_of: Vec<usize>,
    pub n_trees: usize,
    /// Member voxel indices per junction cluster, representative first
    pub clusters: Vec<Vec<usize>>,
    /// Node id of each cluster
    pub cluster_node: Vec<usize>,
    pub nodes: Vec<Node>,
    pub node_of: Vec<Option<usize>>,
    pub branches: Vec<Branch>,
}

impl VoxelGraph {
    pub(crate) fn build(raster: &Raster<u8>) -> Self {
        let voxels = raster.foreground();
        let n = voxels.len();
        let index: HashMap<Voxel, usize> =
            voxels.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        let offsets = Connectivity::Vertex26.offsets();
        let neighbours: Vec<Vec<usize>> = voxels
            .iter()
            .map(|v| {
                offsets
                    .iter()
                    .filter_map(|&(dx, dy, dz)| v.offset(dx, dy, dz))
                    .filter_map(|nb| index.get(&nb).copied())
                    .collect()
            })
            .collect();

        let class: Vec<VoxelClass> = neighbours
            .iter()
            .map(|nb| VoxelClass::from_neighbours(nb.len()))
            .collect();

        let mut graph = Self {
            voxels,
            class,
            neighbours,
            tree_of: vec![usize::MAX; n],
            n_trees: 0,
            clusters: Vec::new(),
            cluster_node: Vec::new(),
            nodes: Vec::new(),
            node_of: vec![None; n],
            branches: Vec::new(),
        };

        graph.label_trees();
        graph.cluster_junctions();
        graph.create_nodes();
        graph.trace_branches(raster.calibration());
        graph
    }

    fn label_trees(&mut self) {
        let n = self.voxels.len();
        let mut stack = Vec::new();
        for seed in 0..n {
            if self.tree_of[seed] != usize::MAX {
                continue;
            }
            let label = self.n_trees;
            self.tree_of[seed] = label;
            stack.push(seed);
            while let Some(i) = stack.pop() {
                for &j in &self.neighbours[i] {
                    if self.tree_of[j] == usize::MAX {
                        self.tree_of[j] = label;
                        stack.push(j);
                    }
                }
            }
            self.n_trees += 1;
        }
    }

    fn cluster_junctions(&mut self) {
        let n = self.voxels.len();
        let mut uf = UnionFind::new(n);
        for i in 0..n {
            if self.class[i] != VoxelClass::Junction {
                continue;
            }
            for &j in &self.neighbours[i] {
                if self.class[j] == VoxelClass::Junction {
                    uf.union(i, j);
                }
            }
        }

        let mut cluster_of_root: HashMap<usize, usize> = HashMap::new();
        for i in 0..n {
            if self.class[i] != VoxelClass::Junction {
                continue;
            }
            let root = uf.find(i);
            let next = self.clusters.len();
            let c = *cluster_of_root.entry(root).or_insert(next);
            if c == next {
                self.clusters.push(Vec::new());
            }
            self.clusters[c].push(i);
        }
    }

    fn create_nodes(&mut self) {
        self.cluster_node = vec![usize::MAX; self.clusters.len()];
        let mut cluster_of = vec![usize::MAX; self.voxels.len()];
        for (c, members) in self.clusters.iter().enumerate() {
            for &i in members {
                cluster_of[i] = c;
            }
        }

        for i in 0..self.voxels.len() {
            match self.class[i] {
                VoxelClass::EndPoint => {
                    self.node_of[i] = Some(self.push_node(NodeKind::EndPoint, i));
                }
                VoxelClass::Junction => {
                    let c = cluster_of[i];
                    // the representative is the first member in scan order
                    if self.clusters[c][0] == i {
                        self.cluster_node[c] = self.push_node(NodeKind::Junction, i);
                    }
                    self.node_of[i] = Some(self.cluster_node[c]);
                }
                _ => {}
            }
        }
    }

    fn push_node(&mut self, kind: NodeKind, i: usize) -> usize {
        self.nodes.push(Node {
            kind,
            voxel: self.voxels[i],
            tree: self.tree_of[i],
        });
        self.nodes.len() - 1
    }

    fn trace_branches(&mut self, calibration: &Calibration) {
        let n = self.voxels.len();
        let mut visited = vec![false; n];

        for i in 0..n {
            if !self.class[i].is_node() {
                continue;
            }
            for k in 0..self.neighbours[i].len() {
                let j = self.neighbours[i][k];
                let path = match (self.class[i], self.class[j]) {
                    (_, VoxelClass::Slab) if !visited[j] => self.trace_chain(i, j, &mut visited),
                    // direct contacts are recorded once, from the end-point side
                    (VoxelClass::EndPoint, VoxelClass::Junction) => vec![i, j],
                    (VoxelClass::EndPoint, VoxelClass::EndPoint) if j > i => vec![i, j],
                    _ => continue,
                };
                self.push_branch(path, calibration);
            }
        }

        // slabs left unvisited form rings without end-points or junctions
        for i in 0..n {
            if self.class[i] != VoxelClass::Slab || visited[i] {
                continue;
            }
            visited[i] = true;
            self.node_of[i] = Some(self.push_node(NodeKind::LoopAnchor, i));
            let first = self.neighbours[i][0];
            let path = self.trace_chain(i, first, &mut visited);
            self.push_branch(path, calibration);
        }
    }

    /// Follow slabs from `start` through `first` until a node, or back to `start`
    fn trace_chain(&self, start: usize, first: usize, visited: &mut [bool]) -> Vec<usize> {
        let mut path = vec![start, first];
        visited[first] = true;
        let (mut prev, mut cur) = (start, first);
        while self.class[cur] == VoxelClass::Slab {
            let Some(next) = self.neighbours[cur].iter().copied().find(|&nb| nb != prev) else {
                break;
            };
            path.push(next);
            if next == start || self.class[next] != VoxelClass::Slab || visited[next] {
                break;
            }
            visited[next] = true;
            prev = cur;
            cur = next;
        }
        path
    }

    fn push_branch(&mut self, path: Vec<usize>, calibration: &Calibration) {
        let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
            return;
        };
        let (Some(start), Some(end)) = (self.node_of[first], self.node_of[last]) else {
            return;
        };
        let voxels: Vec<Voxel> = path.iter().map(|&i| self.voxels[i]).collect();
        let length = path_length(&voxels, calibration);
        self.branches.push(Branch {
            start,
            end,
            voxels,
            length,
            tree: self.tree_of[first],
        });
    }

    /// Distinct branches attached to a node
    pub(crate) fn degree(&self, node: usize) -> usize {
        self.branches
            .iter()
            .filter(|b| b.start == node || b.end == node)
            .count()
    }
}
