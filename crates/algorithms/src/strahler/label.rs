//! Order label image helpers

use arbor_core::raster::{Connectivity, Raster, Voxel};
use ndarray::{Array3, Axis};

use crate::maybe_rayon::*;

/// Add one to every label voxel that is foreground in `snapshot`
pub(crate) fn accumulate(labels: &mut Raster<u16>, snapshot: &Raster<u8>) {
    labels
        .data_mut()
        .zip_mut_with(snapshot.data(), |l, &s| {
            if s != 0 {
                *l = l.saturating_add(1);
            }
        });
}

/// Clear junction voxels still joining at least three voxels of their own order
pub(crate) fn clear_junction_voxels(labels: &mut Raster<u16>, junctions: &[Voxel]) {
    let snapshot = labels.clone();
    let offsets = Connectivity::Vertex26.offsets();
    for &j in junctions {
        let order = snapshot.at(j);
        if order == 0 {
            continue;
        }
        let (x, y, z) = (j.x as isize, j.y as isize, j.z as isize);
        let same = offsets
            .iter()
            .filter(|&&(dx, dy, dz)| snapshot.get_or_zero(x + dx, y + dy, z + dz) == order)
            .count();
        if same >= 3 {
            labels.put(j, 0);
        }
    }
}

/// Binary mask of the voxels labelled exactly `order`
pub fn threshold_order(labels: &Raster<u16>, order: u16) -> Raster<u8> {
    let mut mask = labels.with_same_meta::<u8>();
    mask.data_mut()
        .zip_mut_with(labels.data(), |m, &l| *m = if l == order { 255 } else { 0 });
    mask
}

/// Build the iteration stack: one projected slice per iteration snapshot,
/// followed by one overlay slice per voxel set.
pub(crate) fn iteration_stack(snapshots: Vec<Raster<u8>>, overlays: &[&[Voxel]]) -> Option<Raster<u8>> {
    let first = snapshots.first()?;
    let (width, height, _) = first.shape();
    let calibration = first.calibration().clone();

    let projected: Vec<Raster<u8>> = snapshots
        .into_par_iter()
        .map(|s| s.z_max_projection())
        .collect();

    let depth = projected.len() + overlays.len();
    let mut stack = Array3::<u8>::zeros((depth, height, width));
    for (z, slice) in projected.iter().enumerate() {
        stack
            .index_axis_mut(Axis(0), z)
            .assign(&slice.data().index_axis(Axis(0), 0));
    }
    for (i, voxels) in overlays.iter().enumerate() {
        let z = projected.len() + i;
        for v in voxels.iter() {
            stack[(z, v.y, v.x)] = 255;
        }
    }

    Some(Raster::from_array(stack).with_calibration(calibration))
}
