//! arbor CLI - Strahler analysis of skeletonized images

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use arbor_algorithms::morphology::{skeletonize, ThinningParams};
use arbor_algorithms::skeleton::{summarize_skeleton, LoopPolicy, SkeletonParams};
use arbor_algorithms::strahler::{analyse_strahler, Diagnostic, Report, StrahlerParams};
use arbor_algorithms::synthetic::{fractal_tree, fractal_tree_stack, FractalTreeParams};
use arbor_core::io::{read_stack, write_stack, StackOptions, StackSample};
use arbor_core::{Calibration, Raster, Rect};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "arbor")]
#[command(author, version, about = "Strahler order analysis of skeleton images", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Label a skeleton with Strahler orders and print the report as JSON
    Strahler {
        /// Input 8-bit binary TIFF (single image or stack)
        input: PathBuf,
        /// Output 16-bit order label TIFF
        output: PathBuf,
        /// Grayscale TIFF for the intensity-based loop policies
        #[arg(long)]
        intensity: Option<PathBuf>,
        /// Root region as x,y,width,height
        #[arg(long)]
        root_roi: Option<String>,
        /// Loop policy: none, shortest-branch, lowest-intensity-voxel, lowest-intensity-branch
        #[arg(short, long)]
        loop_policy: Option<String>,
        /// Maximum number of pruning iterations
        #[arg(short, long)]
        max_iterations: Option<u32>,
        /// Keep voxels without neighbours and count single-point arbors
        #[arg(long)]
        keep_isolated: bool,
        /// Write the per-iteration stack to this file
        #[arg(long)]
        iteration_stack: Option<PathBuf>,
        /// JSON file with analysis parameters; flags override its values
        #[arg(short, long)]
        params: Option<PathBuf>,
        #[command(flatten)]
        calibration: CalibrationArgs,
    },
    /// Print whole-skeleton measurements as JSON
    Summarize {
        /// Input 8-bit binary TIFF
        input: PathBuf,
        /// Loop policy: none, shortest-branch
        #[arg(short, long, default_value = "shortest-branch")]
        loop_policy: String,
        #[command(flatten)]
        calibration: CalibrationArgs,
    },
    /// Thin a binary image down to its skeleton
    Skeletonize {
        /// Input 8-bit binary TIFF
        input: PathBuf,
        /// Output skeleton TIFF
        output: PathBuf,
        /// Keep voxels left without neighbours
        #[arg(long)]
        keep_isolated: bool,
    },
    /// Draw a synthetic fractal tree
    FractalTree {
        /// Output TIFF
        output: PathBuf,
        /// Image width in pixels
        #[arg(long, default_value = "140")]
        width: usize,
        /// Image height in pixels
        #[arg(long, default_value = "170")]
        height: usize,
        /// Recursion depth; a stack sets it per slice instead
        #[arg(short, long, default_value = "5", conflicts_with = "slices")]
        recursions: u32,
        /// Trunk direction in degrees (-90 points up)
        #[arg(short, long, default_value = "-90", allow_hyphen_values = true)]
        angle: f64,
        /// Write a stack of this many trees, slice i grown with i levels
        #[arg(long)]
        slices: Option<usize>,
    },
}

#[derive(clap::Args)]
struct CalibrationArgs {
    /// Pixel width in physical units
    #[arg(long)]
    pixel_width: Option<f64>,
    /// Pixel height in physical units
    #[arg(long)]
    pixel_height: Option<f64>,
    /// Slice spacing in physical units
    #[arg(long)]
    voxel_depth: Option<f64>,
    /// Unit label, e.g. um
    #[arg(long)]
    unit: Option<String>,
}

impl CalibrationArgs {
    /// Apply the given values on top of the calibration read from file
    fn apply(&self, base: &Calibration) -> Result<Calibration> {
        let cal = Calibration {
            pixel_width: self.pixel_width.unwrap_or(base.pixel_width),
            pixel_height: self.pixel_height.unwrap_or(base.pixel_height),
            voxel_depth: self.voxel_depth.unwrap_or(base.voxel_depth),
            unit: self.unit.clone().unwrap_or_else(|| base.unit.clone()),
        };
        for (name, value) in [
            ("pixel width", cal.pixel_width),
            ("pixel height", cal.pixel_height),
            ("voxel depth", cal.voxel_depth),
        ] {
            if !(value.is_finite() && value > 0.0) {
                bail!("{} must be a positive number, got {}", name, value);
            }
        }
        Ok(cal)
    }
}

/// JSON printed by the `strahler` subcommand
#[derive(Serialize)]
struct StrahlerOutput<'a> {
    report: &'a Report,
    notes: &'a str,
    cut_voxels: usize,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_image(path: &Path) -> Result<Raster<u8>> {
    let pb = spinner("Reading image...");
    let raster = read_stack(path).with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    let (w, h, d) = raster.shape();
    info!("Input: {} x {} x {}", w, h, d);
    Ok(raster)
}

fn write_image<T: StackSample>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_stack(raster, path, Some(StackOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    eprintln!("{} saved to: {}", name, path.display());
    eprintln!("  Processing time: {:.2?}", elapsed);
}

/// Truncated runs still carry a usable report; anything else means no orders
fn diagnostic_level(diagnostic: &Diagnostic) -> Level {
    if diagnostic.is_truncation() {
        Level::WARN
    } else {
        Level::ERROR
    }
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        if diagnostic_level(diagnostic) == Level::WARN {
            warn!("{} (partial results kept)", diagnostic);
        } else {
            error!("{}", diagnostic);
        }
    }
}

fn note_calibration(cal: &Calibration) {
    if cal.is_uncalibrated() {
        info!("Image is uncalibrated; lengths are in pixels");
    }
}

fn parse_loop_policy(s: &str) -> Result<LoopPolicy> {
    match s.to_lowercase().replace('_', "-").as_str() {
        "none" => Ok(LoopPolicy::None),
        "shortest-branch" | "shortest" => Ok(LoopPolicy::ShortestBranch),
        "lowest-intensity-voxel" | "voxel" => Ok(LoopPolicy::LowestIntensityVoxel),
        "lowest-intensity-branch" | "branch" => Ok(LoopPolicy::LowestIntensityBranch),
        _ => bail!(
            "Unknown loop policy: {}. Use: none, shortest-branch, lowest-intensity-voxel, lowest-intensity-branch",
            s
        ),
    }
}

fn parse_roi(s: &str) -> Result<Rect> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid root ROI '{}'", s))?;
    match parts.as_slice() {
        &[x, y, width, height] => Ok(Rect::new(x, y, width, height)),
        _ => bail!("Root ROI must be x,y,width,height, got '{}'", s),
    }
}

fn load_params(path: Option<&Path>) -> Result<StrahlerParams> {
    let Some(path) = path else {
        return Ok(StrahlerParams::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid parameters in {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Strahler {
            input,
            output,
            intensity,
            root_roi,
            loop_policy,
            max_iterations,
            keep_isolated,
            iteration_stack,
            params,
            calibration,
        } => {
            let mut params = load_params(params.as_deref())?;
            if let Some(roi) = root_roi {
                params.root_roi = Some(parse_roi(&roi)?);
            }
            if let Some(policy) = loop_policy {
                params.loop_policy = parse_loop_policy(&policy)?;
            }
            if let Some(n) = max_iterations {
                params.max_iterations = n;
            }
            if keep_isolated {
                params.erode_isolated = false;
            }
            if iteration_stack.is_some() {
                params.keep_iteration_stack = true;
            }

            let raster = read_image(&input)?;
            let cal = calibration.apply(raster.calibration())?;
            note_calibration(&cal);
            let raster = raster.with_calibration(cal);
            let intensity = intensity.as_deref().map(read_image).transpose()?;

            let pb = spinner("Computing Strahler orders...");
            let start = Instant::now();
            let result = analyse_strahler(&raster, intensity.as_ref(), &params);
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            log_diagnostics(&result.diagnostics);
            write_image(&result.label_image, &output)?;
            done("Strahler labels", &output, elapsed);
            if let (Some(path), Some(stack)) = (iteration_stack, result.iteration_stack.as_ref()) {
                write_image(stack, &path)?;
                done("Iteration stack", &path, elapsed);
            }

            let json = serde_json::to_string_pretty(&StrahlerOutput {
                report: &result.report,
                notes: &result.notes,
                cut_voxels: result.cut_voxels.len(),
            })?;
            println!("{}", json);
        }

        Commands::Summarize {
            input,
            loop_policy,
            calibration,
        } => {
            let params = SkeletonParams {
                loop_policy: parse_loop_policy(&loop_policy)?,
            };
            if params.loop_policy.needs_intensity() {
                bail!("summarize does not take an intensity image; use none or shortest-branch");
            }
            let raster = read_image(&input)?;
            let cal = calibration.apply(raster.calibration())?;
            note_calibration(&cal);
            let raster = raster.with_calibration(cal).binarize(255);

            let summary = summarize_skeleton(&raster, &params).context("Failed to summarize skeleton")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Skeletonize {
            input,
            output,
            keep_isolated,
        } => {
            let raster = read_image(&input)?;
            let params = ThinningParams {
                erode_isolated: !keep_isolated,
            };
            let pb = spinner("Thinning...");
            let start = Instant::now();
            let skeleton = skeletonize(&raster, &params).context("Failed to skeletonize")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();
            info!(
                "Kept {} of {} foreground voxels",
                skeleton.count_foreground(),
                raster.count_foreground()
            );
            write_image(&skeleton, &output)?;
            done("Skeleton", &output, elapsed);
        }

        Commands::FractalTree {
            output,
            width,
            height,
            recursions,
            angle,
            slices,
        } => {
            let params = FractalTreeParams {
                width,
                height,
                angle,
                recursions,
                ..FractalTreeParams::default()
            };
            let start = Instant::now();
            let raster = match slices {
                Some(n) => fractal_tree_stack(&params, n),
                None => fractal_tree(&params),
            }
            .context("Failed to draw fractal tree")?;
            let elapsed = start.elapsed();
            write_image(&raster, &output)?;
            done("Fractal tree", &output, elapsed);
        }
    }

    Ok(())
}
