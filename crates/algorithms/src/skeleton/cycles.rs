//! Cycle detection on the branch graph
//!
//! Branches are added to a spanning forest in enumeration order. A branch
//! whose two nodes are already connected closes a fundamental cycle made of
//! that branch plus the forest path between its nodes.

use std::collections::VecDeque;

use super::graph::{Branch, UnionFind};

/// Fundamental cycles as lists of branch indices, closing branch first
pub(crate) fn find_cycles(n_nodes: usize, branches: &[Branch]) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(n_nodes);
    let mut forest: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n_nodes];
    let mut closing = Vec::new();

    for (b, branch) in branches.iter().enumerate() {
        if uf.union(branch.start, branch.end) {
            forest[branch.start].push((branch.end, b));
            forest[branch.end].push((branch.start, b));
        } else {
            closing.push(b);
        }
    }

    closing
        .into_iter()
        .map(|b| {
            let branch = &branches[b];
            let mut cycle = vec![b];
            if !branch.is_loop() {
                cycle.extend(forest_path(&forest, branch.start, branch.end));
            }
            cycle
        })
        .collect()
}

/// Branch indices along the unique forest path from `from` to `to`
fn forest_path(forest: &[Vec<(usize, usize)>], from: usize, to: usize) -> Vec<usize> {
    let mut via: Vec<Option<(usize, usize)>> = vec![None; forest.len()];
    let mut seen = vec![false; forest.len()];
    let mut queue = VecDeque::from([from]);
    seen[from] = true;

    while let Some(node) = queue.pop_front() {
        if node == to {
            break;
        }
        for &(next, b) in &forest[node] {
            if !seen[next] {
                seen[next] = true;
                via[next] = Some((node, b));
                queue.push_back(next);
            }
        }
    }

    let mut path = Vec::new();
    let mut cur = to;
    while let Some((prev, b)) = via[cur] {
        path.push(b);
        cur = prev;
    }
    path.reverse();
    path
}
