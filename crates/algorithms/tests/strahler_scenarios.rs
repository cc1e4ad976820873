//! End-to-end Strahler scenarios on small synthetic skeletons.
//!
//! Every shape here is already one voxel thick, so thinning leaves it
//! untouched and the expected counts can be read off the drawing.

use approx::assert_relative_eq;
use arbor_algorithms::skeleton::LoopPolicy;
use arbor_algorithms::strahler::{analyse_strahler, StrahlerParams, StrahlerResult};
use arbor_core::raster::{Calibration, Raster, Rect, Voxel};

fn draw(points: &[(usize, usize, usize)], width: usize, height: usize, depth: usize) -> Raster<u8> {
    let mut r = Raster::new(width, height, depth);
    for &(x, y, z) in points {
        r.set(x, y, z, 255).unwrap();
    }
    r
}

fn run(raster: &Raster<u8>, params: &StrahlerParams) -> StrahlerResult {
    analyse_strahler(raster, None, params)
}

/// Diagonal segment of `n` voxels starting one step away from `(x, y)`
fn diagonal(x: usize, y: usize, n: usize, rightwards: bool) -> Vec<(usize, usize, usize)> {
    (1..=n)
        .map(|i| {
            let px = if rightwards { x + i } else { x - i };
            (px, y - i, 0)
        })
        .collect()
}

/// Stem, then three levels of symmetric bifurcations: 8 leaves, 15 branches.
///
/// Root end-point at (30, 60), first junction at (30, 54), second-level
/// junctions at (18, 42) and (42, 42), third-level at x = 12, 24, 36, 48 on
/// row 36, leaves ending on row 32.
fn binary_tree() -> Raster<u8> {
    let mut pts: Vec<_> = (54..=60).map(|y| (30, y, 0)).collect();
    for (x1, right1) in [(30, false), (30, true)] {
        pts.extend(diagonal(x1, 54, 12, right1));
        let x2 = if right1 { x1 + 12 } else { x1 - 12 };
        for right2 in [false, true] {
            pts.extend(diagonal(x2, 42, 6, right2));
            let x3 = if right2 { x2 + 6 } else { x2 - 6 };
            pts.extend(diagonal(x3, 36, 4, false));
            pts.extend(diagonal(x3, 36, 4, true));
        }
    }
    draw(&pts, 61, 64, 1)
}

/// Three arms of five voxels meeting at (10, 10)
fn y_shape() -> Raster<u8> {
    let mut pts = vec![(10, 10, 0)];
    for i in 1..=5 {
        pts.push((10, 10 - i, 0));
        pts.push((10 - i, 10 + i, 0));
        pts.push((10 + i, 10 + i, 0));
    }
    draw(&pts, 21, 21, 1)
}

fn ring() -> Raster<u8> {
    let (cx, cy, r) = (10usize, 10usize, 5usize);
    let mut pts = Vec::new();
    for i in 0..r {
        pts.push((cx - i, cy - r + i, 0));
        pts.push((cx - r + i, cy + i, 0));
        pts.push((cx + i, cy + r - i, 0));
        pts.push((cx + r - i, cy - i, 0));
    }
    draw(&pts, 21, 21, 1)
}

#[test]
fn s1_straight_line() {
    let pts: Vec<_> = (3..13).map(|x| (x, 4, 0)).collect();
    let raster = draw(&pts, 16, 9, 1).with_calibration(Calibration::new(0.5, 0.5, 1.0, "um"));
    let result = run(&raster, &StrahlerParams::default());

    assert!(result.is_complete(), "{}", result.notes);
    assert!(result.notes.is_empty());
    assert_eq!(result.report.iterations.len(), 1);
    assert_eq!(result.report.iterations[0].endpoints, 2);
    assert_eq!(result.report.iterations[0].junctions, 0);

    let orders = &result.report.orders;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order, 1);
    assert_eq!(orders[0].branch_count, 1);
    assert_relative_eq!(orders[0].mean_branch_length, 4.5, epsilon = 1e-12);
    assert!(orders[0].ramification_ratio.is_nan());
    assert_eq!(orders[0].unit, "um");
}

#[test]
fn s2_y_shape() {
    let raster = y_shape();
    let params = StrahlerParams {
        erode_isolated: false,
        ..StrahlerParams::default()
    };
    let result = run(&raster, &params);

    assert!(result.is_complete(), "{}", result.notes);
    for i in 1..=5 {
        assert_eq!(result.label_image.get(10, 10 - i, 0).unwrap(), 1);
        assert_eq!(result.label_image.get(10 - i, 10 + i, 0).unwrap(), 1);
        assert_eq!(result.label_image.get(10 + i, 10 + i, 0).unwrap(), 1);
    }
    assert_eq!(result.label_image.get(10, 10, 0).unwrap(), 2);
    // second iteration sees the junction collapsed to a single voxel
    assert_eq!(result.report.iterations[1].trees, 1);
    assert_eq!(result.report.iterations[1].branches, 0);

    let orders = &result.report.orders;
    assert_eq!(orders[0].branch_count, 3);
    assert_eq!(orders[1].branch_count, 1);
    assert_relative_eq!(orders[1].ramification_ratio, 3.0);
}

#[test]
fn s3_binary_tree_with_root() {
    let params = StrahlerParams {
        root_roi: Some(Rect::new(25, 58, 11, 6)),
        ..StrahlerParams::default()
    };
    let result = run(&binary_tree(), &params);
    assert!(result.is_complete(), "{}", result.notes);

    let report = &result.report;
    assert_eq!(report.branch_counts(), vec![8, 4, 2, 1]);
    assert!(report.orders[0].ramification_ratio.is_nan());
    for order in &report.orders[1..] {
        assert_relative_eq!(order.ramification_ratio, 2.0);
    }
    let sqrt2 = 2f64.sqrt();
    assert_relative_eq!(report.orders[0].mean_branch_length, 3.0 * sqrt2, epsilon = 1e-9);
    assert_relative_eq!(report.orders[1].mean_branch_length, 5.0 * sqrt2, epsilon = 1e-9);
    assert_relative_eq!(report.orders[2].mean_branch_length, 11.0 * sqrt2, epsilon = 1e-9);
    assert_relative_eq!(report.orders[3].mean_branch_length, 6.0, epsilon = 1e-9);

    let endpoints: Vec<usize> = report.iterations.iter().map(|r| r.endpoints).collect();
    assert_eq!(endpoints, vec![8, 4, 2, 1]);
    let junctions: Vec<usize> = report.iterations.iter().map(|r| r.junctions).collect();
    assert_eq!(junctions, vec![7, 3, 1, 0]);

    let root = report.root.as_ref().unwrap();
    assert_eq!(root.endpoints, 1);
    assert_eq!(root.junctions, 0);
    assert_eq!(root.note, "Root-branches inferred from ROI");
}

#[test]
fn s3_binary_tree_without_root_prunes_the_stem() {
    let result = run(&binary_tree(), &StrahlerParams::default());
    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.report.branch_counts(), vec![9, 4, 1]);
    assert!(result.report.root.is_none());
    assert_eq!(result.label_image.get(30, 60, 0).unwrap(), 1);
}

#[test]
fn s4_ring_without_loop_policy() {
    let params = StrahlerParams {
        loop_policy: LoopPolicy::None,
        ..StrahlerParams::default()
    };
    let result = run(&ring(), &params);

    assert!(!result.is_complete());
    assert!(result.notes.contains("UnresolvedLoop"), "{}", result.notes);
    assert!(result.report.orders.is_empty());
    assert!(result.label_image.is_blank());
}

#[test]
fn s5_ring_cut_at_shortest_branch() {
    let result = run(&ring(), &StrahlerParams::default());

    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.cut_voxels, vec![Voxel::new(10, 15, 0)]);
    assert_eq!(result.label_image.get(10, 15, 0).unwrap(), 0);
    assert_eq!(result.report.iterations[0].endpoints, 2);
    assert_eq!(result.report.orders[0].branch_count, 1);
    assert_eq!(result.label_image.count_foreground(), 19);
}

#[test]
fn s5_ring_cut_is_deterministic() {
    let a = run(&ring(), &StrahlerParams::default());
    let b = run(&ring(), &StrahlerParams::default());
    assert_eq!(a.cut_voxels, b.cut_voxels);
    assert_eq!(a.label_image.data(), b.label_image.data());
}

fn uniform_intensity(value: u8) -> Raster<u8> {
    let mut r = Raster::new(21, 21, 1);
    r.data_mut().fill(value);
    r
}

#[test]
fn ring_cut_at_darkest_voxel() {
    let mut intensity = uniform_intensity(255);
    intensity.set(12, 7, 0, 3).unwrap();
    let params = StrahlerParams {
        loop_policy: LoopPolicy::LowestIntensityVoxel,
        ..StrahlerParams::default()
    };
    let result = analyse_strahler(&ring(), Some(&intensity), &params);

    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.cut_voxels, vec![Voxel::new(12, 7, 0)]);
    assert_eq!(result.label_image.get(12, 7, 0).unwrap(), 0);
    assert_eq!(result.report.branch_counts(), vec![1]);
}

#[test]
fn ring_cut_at_darkest_branch() {
    let intensity = uniform_intensity(128);
    let params = StrahlerParams {
        loop_policy: LoopPolicy::LowestIntensityBranch,
        ..StrahlerParams::default()
    };
    let result = analyse_strahler(&ring(), Some(&intensity), &params);

    // a single branch, so its midpoint is cut as with the shortest-branch policy
    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.cut_voxels, vec![Voxel::new(10, 15, 0)]);
    assert_eq!(result.report.branch_counts(), vec![1]);
}

#[test]
fn intensity_of_wrong_shape_is_rejected() {
    let intensity: Raster<u8> = Raster::new(3, 3, 1);
    let params = StrahlerParams {
        loop_policy: LoopPolicy::LowestIntensityVoxel,
        ..StrahlerParams::default()
    };
    let result = analyse_strahler(&y_shape(), Some(&intensity), &params);

    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind(), "MissingIntensity");
    assert!(result.notes.starts_with("MissingIntensity"), "{}", result.notes);
    assert!(result.label_image.is_blank());
    assert!(result.report.orders.is_empty());
}

#[test]
fn root_roi_over_everything_leaves_no_endpoints() {
    let params = StrahlerParams {
        root_roi: Some(Rect::new(0, 0, 21, 21)),
        ..StrahlerParams::default()
    };
    let result = run(&y_shape(), &params);

    assert!(!result.is_complete());
    assert!(result.notes.contains("NoEndpoints"), "{}", result.notes);
    assert!(result.report.orders.is_empty());
    assert!(result.label_image.is_blank());
    let root = result.report.root.as_ref().unwrap();
    assert_eq!(root.junctions, 1);
    assert_eq!(root.note, "Warning: ROI contains ramified root(s)");
}

/// Y in slice 5 whose lower-right arm dives down to (14, 14, 1)
fn y_with_descending_root() -> Raster<u8> {
    let mut pts = vec![(10, 10, 5)];
    for i in 1..=5 {
        pts.push((10, 10 - i, 5));
        pts.push((10 - i, 10 + i, 5));
    }
    for i in 1..=4 {
        pts.push((10 + i, 10 + i, 5 - i));
    }
    draw(&pts, 21, 21, 8)
}

#[test]
fn root_roi_spans_every_slice() {
    let stack = y_with_descending_root();
    let params = StrahlerParams {
        root_roi: Some(Rect::new(13, 13, 4, 4)),
        ..StrahlerParams::default()
    };
    let result = run(&stack, &params);
    assert!(result.is_complete(), "{}", result.notes);

    // the column clips the arm at (13, 13, 2); only the far tip is a root end-point
    let root = result.report.root.as_ref().unwrap();
    assert_eq!(root.endpoints, 1);
    assert_eq!(root.junctions, 0);
    assert_eq!(result.report.iterations[0].endpoints, 2);
    assert_eq!(result.report.branch_counts(), vec![2, 1]);
    assert_eq!(result.label_image.get(14, 14, 1).unwrap(), 2);

    let without = run(&stack, &StrahlerParams::default());
    assert!(without.is_complete(), "{}", without.notes);
    assert_eq!(without.report.branch_counts(), vec![3]);
    assert_eq!(without.label_image.get(14, 14, 1).unwrap(), 1);
}

fn stack_with_isolated_voxel() -> Raster<u8> {
    let mut pts: Vec<_> = (1..=8).map(|i| (i, 4, i)).collect();
    pts.push((7, 1, 2));
    draw(&pts, 10, 10, 10)
}

#[test]
fn s6_isolated_voxel_eroded() {
    let result = run(&stack_with_isolated_voxel(), &StrahlerParams::default());
    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.report.orders.len(), 1);
    assert_eq!(result.report.orders[0].branch_count, 1);
    assert_eq!(result.report.orders[0].note, "Ignoring single-point arbors");
    assert_eq!(result.label_image.get(7, 1, 2).unwrap(), 0);
    assert_relative_eq!(
        result.report.orders[0].mean_branch_length,
        7.0 * 2f64.sqrt(),
        epsilon = 1e-9
    );
}

#[test]
fn s6_isolated_voxel_counted_as_tree() {
    let params = StrahlerParams {
        erode_isolated: false,
        ..StrahlerParams::default()
    };
    let result = run(&stack_with_isolated_voxel(), &params);
    assert!(result.is_complete(), "{}", result.notes);
    assert_eq!(result.report.orders[0].branch_count, 2);
    assert_eq!(result.report.orders[0].note, "Including single-point arbors");
    assert_eq!(result.label_image.get(7, 1, 2).unwrap(), 1);
}
