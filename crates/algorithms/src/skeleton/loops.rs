//! Loop resolution policies
//!
//! Each policy picks one slab voxel of a cycle to delete. Deleting an
//! interior voxel of a branch on a cycle lowers the cycle rank by exactly
//! one, so repeated rounds terminate.

use arbor_core::raster::{Raster, Voxel};
use serde::{Deserialize, Serialize};

use super::graph::Branch;

/// Strategy used to break skeleton cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopPolicy {
    /// Leave cycles in place
    None,
    /// Delete the midpoint of the shortest branch on the cycle
    #[default]
    ShortestBranch,
    /// Delete the cycle voxel with the lowest intensity
    LowestIntensityVoxel,
    /// Delete the midpoint of the branch with the lowest mean intensity
    LowestIntensityBranch,
}

impl LoopPolicy {
    /// Whether the policy reads an intensity raster
    pub fn needs_intensity(&self) -> bool {
        matches!(
            self,
            LoopPolicy::LowestIntensityVoxel | LoopPolicy::LowestIntensityBranch
        )
    }
}

/// Voxel to delete from a cycle and the branch it lies on.
///
/// `None` when the policy leaves cycles alone or no branch of the cycle has
/// an interior voxel to remove.
pub(crate) fn choose_cut(
    policy: LoopPolicy,
    cycle: &[usize],
    branches: &[Branch],
    intensity: Option<&Raster<u8>>,
) -> Option<(usize, Voxel)> {
    match (policy, intensity) {
        (LoopPolicy::None, _) => None,
        (LoopPolicy::ShortestBranch, _) => {
            let b = cuttable(cycle, branches).min_by(|&a, &b| {
                branches[a]
                    .length
                    .total_cmp(&branches[b].length)
                    .then(a.cmp(&b))
            })?;
            Some((b, branches[b].midpoint()?))
        }
        (LoopPolicy::LowestIntensityVoxel, Some(image)) => cuttable(cycle, branches)
            .flat_map(move |b| branches[b].interior().iter().map(move |&v| (b, v)))
            .min_by(|&(_, a), &(_, b)| image.at(a).cmp(&image.at(b)).then(a.cmp(&b))),
        (LoopPolicy::LowestIntensityBranch, Some(image)) => {
            let b = cuttable(cycle, branches)
                .map(|b| (b, mean_intensity(&branches[b], image)))
                .min_by(|&(a, ma), &(b, mb)| {
                    ma.total_cmp(&mb)
                        .then(branches[a].length.total_cmp(&branches[b].length))
                        .then(a.cmp(&b))
                })?
                .0;
            Some((b, branches[b].midpoint()?))
        }
        (_, None) => None,
    }
}

/// Cycle branches that have an interior voxel to delete
fn cuttable<'a>(cycle: &'a [usize], branches: &'a [Branch]) -> impl Iterator<Item = usize> + 'a {
    cycle
        .iter()
        .copied()
        .filter(move |&b| !branches[b].interior().is_empty())
}

/// Mean intensity over a branch's interior voxels
fn mean_intensity(branch: &Branch, image: &Raster<u8>) -> f64 {
    let interior = branch.interior();
    let sum: f64 = interior.iter().map(|&v| image.at(v) as f64).sum();
    sum / interior.len() as f64
}
