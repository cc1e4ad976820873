//! Strahler order analysis by iterative end-branch pruning
//!
//! Each iteration analyses the working skeleton, adds it to an order
//! accumulator and prunes every terminal branch. A voxel that survives `k`
//! iterations ends with label `k`, its Strahler order. End-points inside
//! the optional root region are never pruned or counted.
//!
//! Reference: Strahler, A. N. (1957). Quantitative analysis of watershed
//! geomorphology. Transactions, American Geophysical Union, 38(6), 913-920.

use arbor_core::raster::{Raster, RasterElement, Rect, Voxel};
use arbor_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::maybe_rayon::*;
use crate::morphology::{erode_isolated, thin};
use crate::skeleton::{analyse_skeleton, validate_intensity, LoopPolicy, SkeletonAnalysis, SkeletonParams};

use super::label::{accumulate, clear_junction_voxels, iteration_stack, threshold_order};
use super::report::{render_notes, Diagnostic, IterationRecord, OrderRecord, Report};

/// Parameters for Strahler analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrahlerParams {
    /// Region (applied to every slice) where the tree is rooted
    pub root_roi: Option<Rect>,
    /// How skeleton cycles are broken
    pub loop_policy: LoopPolicy,
    /// Upper bound on pruning iterations
    pub max_iterations: u32,
    /// Remove voxels without neighbours after each thinning
    pub erode_isolated: bool,
    /// Return one slice per iteration plus overlay slices
    pub keep_iteration_stack: bool,
}

impl Default for StrahlerParams {
    fn default() -> Self {
        Self {
            root_roi: None,
            loop_policy: LoopPolicy::default(),
            max_iterations: 30,
            erode_isolated: true,
            keep_iteration_stack: false,
        }
    }
}

/// Input of the [`Strahler`] algorithm: skeleton and optional intensity image
#[derive(Debug, Clone)]
pub struct StrahlerInput {
    pub skeleton: Raster<u8>,
    pub intensity: Option<Raster<u8>>,
}

/// Strahler analysis algorithm
#[derive(Debug, Clone, Default)]
pub struct Strahler;

impl Algorithm for Strahler {
    type Input = StrahlerInput;
    type Output = StrahlerResult;
    type Params = StrahlerParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Strahler"
    }

    fn description(&self) -> &'static str {
        "Strahler order labelling and per-order branch statistics"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(analyse_strahler(
            &input.skeleton,
            input.intensity.as_ref(),
            &params,
        ))
    }
}

/// Output of [`analyse_strahler`]
#[derive(Debug, Clone)]
pub struct StrahlerResult {
    /// Strahler order per voxel, 0 for background
    pub label_image: Raster<u16>,
    pub report: Report,
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics rendered one per line; empty on a clean run
    pub notes: String,
    /// Present when `keep_iteration_stack` was set
    pub iteration_stack: Option<Raster<u8>>,
    /// Voxels deleted to break cycles during pruning iterations
    pub cut_voxels: Vec<Voxel>,
}

impl StrahlerResult {
    fn failed<T: RasterElement>(input: &Raster<T>, diagnostic: Diagnostic) -> Self {
        warn!(%diagnostic, "Strahler analysis rejected input");
        let diagnostics = vec![diagnostic];
        Self {
            label_image: input.with_same_meta(),
            report: Report::default(),
            notes: render_notes(&diagnostics),
            diagnostics,
            iteration_stack: None,
            cut_voxels: Vec::new(),
        }
    }

    /// True when every iteration ran to its natural end
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Root region analysis
struct RootInfo {
    roi: Rect,
    record: IterationRecord,
    endpoints: Vec<Voxel>,
    junctions: usize,
}

impl RootInfo {
    fn contains(&self, v: &Voxel) -> bool {
        self.roi.contains(v)
    }
}

fn in_root(root: Option<&RootInfo>, v: &Voxel) -> bool {
    root.is_some_and(|r| r.contains(v))
}

/// Run the Strahler analysis on a binary skeleton.
///
/// Never fails: problems are reported as [`Diagnostic`]s in the result,
/// together with whatever label image and report were assembled before the
/// problem occurred. The input is cloned and never modified.
///
/// # Arguments
/// * `input` - 8-bit binary image, any non-zero voxel is foreground
/// * `intensity` - Grayscale image of the same shape, for intensity loop policies
/// * `params` - Root region, loop policy and iteration controls
pub fn analyse_strahler<T: RasterElement>(
    input: &Raster<T>,
    intensity: Option<&Raster<u8>>,
    params: &StrahlerParams,
) -> StrahlerResult {
    if T::is_float() || T::bit_depth() != 8 {
        return StrahlerResult::failed(
            input,
            Diagnostic::InvalidInput(format!(
                "expected an 8-bit image, got {}-bit samples",
                T::bit_depth()
            )),
        );
    }
    if input.is_empty() || input.is_blank() {
        return StrahlerResult::failed(
            input,
            Diagnostic::InvalidInput("image has no foreground voxels".into()),
        );
    }
    if params.max_iterations == 0 {
        return StrahlerResult::failed(
            input,
            Diagnostic::InvalidInput("max_iterations must be at least 1".into()),
        );
    }
    if let Err(e) = validate_intensity(input, params.loop_policy, intensity) {
        return StrahlerResult::failed(input, Diagnostic::MissingIntensity(e.to_string()));
    }

    let mut working = input.binarize(255);
    thin(&mut working);
    if params.erode_isolated {
        erode_isolated(&mut working);
    }
    if working.is_blank() {
        return StrahlerResult::failed(
            input,
            Diagnostic::InvalidInput("no skeleton left after thinning".into()),
        );
    }

    let skeleton_params = SkeletonParams {
        loop_policy: params.loop_policy,
    };

    let root = match params.root_roi.filter(|r| !r.is_empty()) {
        Some(roi) => match analyse_root(&working, roi, &skeleton_params, intensity) {
            Ok(info) => Some(info),
            Err(e) => return StrahlerResult::failed(input, Diagnostic::InvalidInput(e.to_string())),
        },
        None => None,
    };

    let mut labels: Raster<u16> = input.with_same_meta();
    let mut snapshots = Vec::new();
    let mut report = Report {
        root: root.as_ref().map(|r| r.record.clone()),
        ..Report::default()
    };
    let mut diagnostics = Vec::new();
    let mut cut_voxels = Vec::new();
    let mut first_endpoints = Vec::new();
    let mut first_junctions = Vec::new();
    let mut prev_junctions = usize::MAX;
    let mut completed = 0usize;
    let mut k = 1usize;

    loop {
        let analysis = match analyse_skeleton(&working, &skeleton_params, intensity) {
            Ok(a) => a,
            Err(e) => {
                diagnostics.push(Diagnostic::InvalidInput(e.to_string()));
                break;
            }
        };
        cut_voxels.extend_from_slice(&analysis.cut_voxels);

        if analysis.unresolved_loops > 0 && params.loop_policy != LoopPolicy::None {
            diagnostics.push(Diagnostic::UnresolvedLoop { iteration: k });
            break;
        }
        if k >= 2 && analysis.skeleton.is_blank() {
            break;
        }

        let n_endpoints = analysis
            .endpoints
            .iter()
            .filter(|v| !in_root(root.as_ref(), v))
            .count();
        let raw_junctions = analysis.n_junctions();
        let n_junctions = if k == 1 {
            raw_junctions.saturating_sub(root.as_ref().map_or(0, |r| r.junctions))
        } else {
            raw_junctions
        };

        if n_endpoints == 0 {
            diagnostics.push(if analysis.unresolved_loops > 0 {
                Diagnostic::UnresolvedLoop { iteration: k }
            } else {
                Diagnostic::NoEndpoints { iteration: k }
            });
            break;
        }
        if k >= 2 && raw_junctions >= prev_junctions {
            diagnostics.push(Diagnostic::UnresolvedLoop { iteration: k });
            break;
        }

        debug!(
            iteration = k,
            trees = analysis.n_trees(),
            branches = analysis.n_branches(),
            endpoints = n_endpoints,
            junctions = n_junctions,
            "pruning iteration"
        );
        report
            .iterations
            .push(iteration_record(k, &analysis, n_endpoints, n_junctions));
        if k == 1 {
            first_endpoints = analysis.endpoints.clone();
            first_junctions = analysis.junction_voxels.clone();
        }

        accumulate(&mut labels, &analysis.skeleton);
        if params.keep_iteration_stack {
            snapshots.push(analysis.skeleton.clone());
        }
        completed = k;

        if n_junctions == 0 {
            break;
        }
        if k >= params.max_iterations as usize {
            diagnostics.push(Diagnostic::IterationLimit {
                iterations: k,
                junctions: n_junctions,
            });
            break;
        }

        working = prune_terminal_branches(&analysis, root.as_ref());
        thin(&mut working);
        if params.erode_isolated {
            erode_isolated(&mut working);
        }
        prev_junctions = raw_junctions;
        k += 1;
    }

    clear_junction_voxels(&mut labels, &first_junctions);
    report.orders = measure_orders(&labels, completed, &skeleton_params, intensity, params, &mut diagnostics);

    let iteration_stack = if params.keep_iteration_stack {
        let root_endpoints = root.as_ref().map(|r| r.endpoints.clone()).unwrap_or_default();
        let mut overlays: Vec<&[Voxel]> = vec![first_endpoints.as_slice(), first_junctions.as_slice()];
        if root.is_some() {
            overlays.push(root_endpoints.as_slice());
        }
        iteration_stack(snapshots, &overlays)
    } else {
        None
    };

    for diagnostic in &diagnostics {
        warn!(%diagnostic, "Strahler analysis stopped early");
    }
    info!(
        iterations = completed,
        orders = report.orders.len(),
        cuts = cut_voxels.len(),
        "Strahler analysis finished"
    );

    StrahlerResult {
        label_image: labels,
        report,
        notes: render_notes(&diagnostics),
        diagnostics,
        iteration_stack,
        cut_voxels,
    }
}

fn iteration_record(
    iteration: usize,
    analysis: &SkeletonAnalysis,
    endpoints: usize,
    junctions: usize,
) -> IterationRecord {
    IterationRecord {
        iteration,
        trees: analysis.n_trees(),
        branches: analysis.n_branches(),
        endpoints,
        junctions,
        triples: analysis.n_triples(),
        quadruples: analysis.n_quadruples(),
        mean_branch_length: analysis.mean_branch_length(),
        note: String::new(),
    }
}

/// Analyse the skeleton restricted to the root column
fn analyse_root(
    skeleton: &Raster<u8>,
    roi: Rect,
    params: &SkeletonParams,
    intensity: Option<&Raster<u8>>,
) -> Result<RootInfo> {
    let mut column = skeleton.with_same_meta::<u8>();
    for v in skeleton.foreground() {
        if roi.contains(&v) {
            column.put(v, 255);
        }
    }

    let analysis = analyse_skeleton(&column, params, intensity)?;
    // end-points on the outline are where the region cuts the tree
    let endpoints: Vec<Voxel> = analysis
        .endpoints
        .iter()
        .copied()
        .filter(|v| !roi.is_border(v))
        .collect();
    let junctions = analysis.n_junctions();

    let mut record = iteration_record(0, &analysis, endpoints.len(), junctions);
    record.note = if junctions > 0 {
        "Warning: ROI contains ramified root(s)".into()
    } else {
        "Root-branches inferred from ROI".into()
    };

    Ok(RootInfo {
        roi,
        record,
        endpoints,
        junctions,
    })
}

/// Remove terminal branches: everything but junction voxels and root end-points
fn prune_terminal_branches(analysis: &SkeletonAnalysis, root: Option<&RootInfo>) -> Raster<u8> {
    let mut pruned = analysis.skeleton.clone();
    let is_endpoint = |v: &Voxel| analysis.endpoints.binary_search(v).is_ok();
    let is_junction = |v: &Voxel| analysis.junction_voxels.binary_search(v).is_ok();
    let is_terminal = |v: &Voxel| is_endpoint(v) && !in_root(root, v);

    for branch in &analysis.branches {
        let (Some(first), Some(last)) = (branch.voxels.first(), branch.voxels.last()) else {
            continue;
        };
        if !is_terminal(first) && !is_terminal(last) {
            continue;
        }
        for v in &branch.voxels {
            if is_junction(v) || (is_endpoint(v) && in_root(root, v)) {
                continue;
            }
            pruned.put(*v, 0);
        }
    }

    // branchless end-points, i.e. isolated voxels
    for v in analysis.endpoints.iter().filter(|v| is_terminal(v)) {
        pruned.put(*v, 0);
    }
    pruned
}

/// Re-analyse each order layer of the label image
fn measure_orders(
    labels: &Raster<u16>,
    max_order: usize,
    skeleton_params: &SkeletonParams,
    intensity: Option<&Raster<u8>>,
    params: &StrahlerParams,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<OrderRecord> {
    let unit = labels.calibration().unit.clone();
    let measured: Vec<Result<(usize, f64)>> = (1..=max_order)
        .into_par_iter()
        .map(|order| {
            let layer = threshold_order(labels, order.min(u16::MAX as usize) as u16);
            let analysis = analyse_skeleton(&layer, skeleton_params, intensity)?;
            let count = if params.erode_isolated {
                analysis.n_branches()
            } else {
                analysis.n_trees()
            };
            Ok((count, analysis.mean_branch_length()))
        })
        .collect();

    let mut orders = Vec::with_capacity(max_order);
    let mut previous: Option<usize> = None;
    for (i, result) in measured.into_iter().enumerate() {
        let (count, mean) = match result {
            Ok(m) => m,
            Err(e) => {
                diagnostics.push(Diagnostic::InvalidInput(e.to_string()));
                break;
            }
        };
        let ratio = ramification_ratio(previous, count);
        let note = if i == 0 {
            if params.erode_isolated {
                "Ignoring single-point arbors".to_string()
            } else {
                "Including single-point arbors".to_string()
            }
        } else {
            String::new()
        };
        orders.push(OrderRecord {
            order: i + 1,
            branch_count: count,
            mean_branch_length: mean,
            ramification_ratio: ratio,
            unit: unit.clone(),
            note,
        });
        previous = Some(count);
    }
    orders
}

/// Branch count of the previous order over this one; NaN for the first order
fn ramification_ratio(previous: Option<usize>, count: usize) -> f64 {
    match previous {
        Some(prev) => prev as f64 / count as f64,
        None => f64::NAN,
    }
}
