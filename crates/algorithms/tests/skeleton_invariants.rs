//! Quantified invariants of thinning, graph analysis and Strahler labelling.

use std::collections::VecDeque;

use arbor_algorithms::morphology::{skeletonize, thin, ThinningParams};
use arbor_algorithms::skeleton::{analyse_skeleton, SkeletonParams, VoxelClass};
use arbor_algorithms::strahler::{analyse_strahler, StrahlerParams};
use arbor_algorithms::synthetic::{fractal_tree, FractalTreeParams};
use arbor_core::raster::{Connectivity, Raster, Rect, Voxel};

/// Connected components of the foreground, or of the background
fn count_components(raster: &Raster<u8>, foreground: bool, connectivity: Connectivity) -> usize {
    let (w, h, d) = raster.shape();
    let wanted = |v: u8| (v != 0) == foreground;
    let mut seen = vec![false; raster.len()];
    let offsets = connectivity.offsets();
    let mut components = 0;

    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                let start = Voxel::new(x, y, z);
                let idx = raster.index_of(start);
                if seen[idx] || !wanted(raster.at(start)) {
                    continue;
                }
                components += 1;
                seen[idx] = true;
                let mut queue = VecDeque::from([start]);
                while let Some(v) = queue.pop_front() {
                    for &(dx, dy, dz) in &offsets {
                        let Some(n) = v.offset(dx, dy, dz) else { continue };
                        if n.x >= w || n.y >= h || n.z >= d {
                            continue;
                        }
                        let ni = raster.index_of(n);
                        if !seen[ni] && wanted(raster.at(n)) {
                            seen[ni] = true;
                            queue.push_back(n);
                        }
                    }
                }
            }
        }
    }
    components
}

fn assert_homotopic(before: &Raster<u8>) {
    let mut after = before.clone();
    thin(&mut after);
    assert_eq!(
        count_components(before, true, Connectivity::Vertex26),
        count_components(&after, true, Connectivity::Vertex26),
        "foreground components changed"
    );
    assert_eq!(
        count_components(before, false, Connectivity::Face6),
        count_components(&after, false, Connectivity::Face6),
        "background components changed"
    );
    assert!(after.count_foreground() <= before.count_foreground());
    for v in after.foreground() {
        assert_ne!(before.at(v), 0, "thinning added {:?}", v);
    }
}

fn fill(raster: &mut Raster<u8>, x: std::ops::Range<usize>, y: std::ops::Range<usize>, z: std::ops::Range<usize>) {
    for zz in z {
        for yy in y.clone() {
            for xx in x.clone() {
                raster.set(xx, yy, zz, 255).unwrap();
            }
        }
    }
}

#[test]
fn thinning_preserves_topology_2d() {
    // annulus next to a solid blob
    let mut r: Raster<u8> = Raster::new(40, 24, 1);
    fill(&mut r, 2..18, 2..20, 0..1);
    for y in 7..15 {
        for x in 7..13 {
            r.set(x, y, 0, 0).unwrap();
        }
    }
    fill(&mut r, 24..36, 5..12, 0..1);
    assert_eq!(count_components(&r, false, Connectivity::Face6), 2);
    assert_homotopic(&r);
}

#[test]
fn thinning_preserves_topology_3d() {
    let mut r: Raster<u8> = Raster::new(20, 20, 12);
    // square frame with a tunnel along z, padded on every side
    fill(&mut r, 3..17, 3..17, 2..10);
    for z in 2..10 {
        for y in 7..13 {
            for x in 7..13 {
                r.set(x, y, z, 0).unwrap();
            }
        }
    }
    assert_homotopic(&r);

    let mut cavity: Raster<u8> = Raster::new(14, 14, 14);
    fill(&mut cavity, 2..12, 2..12, 2..12);
    fill_zero(&mut cavity, 5..9);
    assert_eq!(count_components(&cavity, false, Connectivity::Face6), 2);
    assert_homotopic(&cavity);
}

fn fill_zero(raster: &mut Raster<u8>, range: std::ops::Range<usize>) {
    for z in range.clone() {
        for y in range.clone() {
            for x in range.clone() {
                raster.set(x, y, z, 0).unwrap();
            }
        }
    }
}

#[test]
fn branches_end_on_nodes() {
    let tree = skeletonize(&fractal_tree(&FractalTreeParams::default()).unwrap(), &ThinningParams::default())
        .unwrap();
    let analysis = analyse_skeleton(&tree, &SkeletonParams::default(), None).unwrap();
    assert!(analysis.n_branches() > 10);

    let class = |v: &Voxel| {
        let n = arbor_algorithms::morphology::neighbour_count(&analysis.skeleton, *v);
        VoxelClass::from_neighbours(n)
    };
    for branch in &analysis.branches {
        assert!(branch.length > 0.0);
        let first = branch.voxels.first().unwrap();
        let last = branch.voxels.last().unwrap();
        if branch.is_loop() {
            continue;
        }
        assert!(class(first).is_node(), "branch starts on {:?}", class(first));
        assert!(class(last).is_node(), "branch ends on {:?}", class(last));
        for v in branch.interior() {
            assert_eq!(class(v), VoxelClass::Slab);
        }
    }
}

#[test]
fn labels_stay_on_the_skeleton() {
    let input = fractal_tree(&FractalTreeParams::default()).unwrap();
    let mut skeleton = input.clone();
    thin(&mut skeleton);
    let result = analyse_strahler(&input, None, &StrahlerParams::default());

    for v in result.label_image.foreground() {
        assert_ne!(skeleton.at(v), 0, "label outside the skeleton at {:?}", v);
    }
    assert!(!result.report.orders.is_empty(), "{}", result.notes);
}

#[test]
fn every_skeleton_voxel_is_labelled_or_cut() {
    // plain line and cycle: no junction voxel is cleared
    let mut r: Raster<u8> = Raster::new(24, 24, 1);
    for i in 0..6 {
        r.set(10 - i, 4 + i, 0, 255).unwrap();
        r.set(5 + i, 9 + i, 0, 255).unwrap();
        r.set(10 + i, 14 - i, 0, 255).unwrap();
        r.set(15 - i, 9 - i, 0, 255).unwrap();
    }
    for x in 2..20 {
        r.set(x, 20, 0, 255).unwrap();
    }
    let result = analyse_strahler(&r, None, &StrahlerParams::default());
    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.cut_voxels.len(), 1);
    for v in r.foreground() {
        assert!(
            result.label_image.at(v) >= 1 || result.cut_voxels.contains(&v),
            "{:?} neither labelled nor cut",
            v
        );
    }
}

/// 45 degree bifurcations from `(x, y)`, one level per entry of `reach`
fn bifurcate(r: &mut Raster<u8>, x: usize, y: usize, reach: &[usize]) {
    let Some((&n, rest)) = reach.split_first() else {
        return;
    };
    for right in [false, true] {
        for i in 1..=n {
            let px = if right { x + i } else { x - i };
            r.set(px, y - i, 0, 255).unwrap();
        }
        let nx = if right { x + n } else { x - n };
        bifurcate(r, nx, y - n, rest);
    }
}

#[test]
fn binary_tree_ramification_is_two() {
    // stem rooted at (64, 86), first junction at (64, 70), four levels
    let mut r: Raster<u8> = Raster::new(130, 90, 1);
    for y in 70..=86 {
        r.set(64, y, 0, 255).unwrap();
    }
    bifurcate(&mut r, 64, 70, &[24, 12, 6, 3]);

    let params = StrahlerParams {
        root_roi: Some(Rect::new(58, 82, 13, 8)),
        ..StrahlerParams::default()
    };
    let result = analyse_strahler(&r, None, &params);
    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.report.branch_counts(), vec![16, 8, 4, 2, 1]);
    for order in &result.report.orders[1..] {
        assert!((order.ramification_ratio - 2.0).abs() < 1e-12);
    }
}

#[test]
fn analysis_is_deterministic() {
    let input = fractal_tree(&FractalTreeParams {
        recursions: 6,
        width: 240,
        height: 240,
        ..FractalTreeParams::default()
    })
    .unwrap();
    let params = StrahlerParams::default();
    let a = analyse_strahler(&input, None, &params);
    let b = analyse_strahler(&input, None, &params);
    assert_eq!(a.label_image.data(), b.label_image.data());
    assert_eq!(
        serde_json::to_string(&a.report).unwrap(),
        serde_json::to_string(&b.report).unwrap()
    );
    assert_eq!(a.cut_voxels, b.cut_voxels);
    assert_eq!(a.notes, b.notes);
}

#[test]
fn root_endpoints_are_never_pruned_or_counted() {
    let mut r: Raster<u8> = Raster::new(30, 30, 1);
    let mut centre = Vec::new();
    for i in 1..=6 {
        centre.push((15, 15 - i));
        centre.push((15 - i, 15 + i));
        centre.push((15 + i, 15 + i));
    }
    r.set(15, 15, 0, 255).unwrap();
    for (x, y) in centre {
        r.set(x, y, 0, 255).unwrap();
    }
    // root column around the lower-right arm tip at (21, 21)
    let roi = Rect::new(19, 19, 6, 6);
    let params = StrahlerParams {
        root_roi: Some(roi),
        ..StrahlerParams::default()
    };
    let result = analyse_strahler(&r, None, &params);
    assert!(result.is_complete(), "{}", result.notes);

    assert_eq!(result.report.iterations[0].endpoints, 2);
    let tip = Voxel::new(21, 21, 0);
    assert_eq!(result.label_image.at(tip), result.report.max_order() as u16);
    for record in &result.report.iterations {
        assert!(record.endpoints <= 2);
    }
    // the upper arm is first order either way
    let without = analyse_strahler(&r, None, &StrahlerParams::default());
    for i in 1..=6 {
        let v = Voxel::new(15, 15 - i, 0);
        assert_eq!(result.label_image.at(v), without.label_image.at(v));
    }
}
