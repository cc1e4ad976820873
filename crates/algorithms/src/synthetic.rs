//! Synthetic skeleton images
//!
//! A recursive Y-branching (L-system) tree drawn with one-pixel lines, and a
//! stack variant where slice `i` holds the tree grown with `i + 1` recursion
//! levels. Useful for demos, benchmarks and tests of the Strahler engine.

use arbor_core::raster::Raster;
use arbor_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters for the fractal tree generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalTreeParams {
    pub width: usize,
    pub height: usize,
    /// Trunk direction in degrees, -90 points up
    pub angle: f64,
    /// Recursion depth; segment length is `recursions * segment_length`
    pub recursions: u32,
    /// Angle between a parent and each child, in degrees
    pub spread: f64,
    /// Length unit per recursion level, in pixels
    pub segment_length: f64,
}

impl Default for FractalTreeParams {
    fn default() -> Self {
        Self {
            width: 140,
            height: 170,
            angle: -90.0,
            recursions: 5,
            spread: 20.0,
            segment_length: 10.0,
        }
    }
}

/// Draw a fractal tree rooted 10 pixels above the bottom centre
pub fn fractal_tree(params: &FractalTreeParams) -> Result<Raster<u8>> {
    if params.width == 0 || params.height == 0 {
        return Err(Error::InvalidDimensions {
            width: params.width,
            height: params.height,
            depth: 1,
        });
    }
    let mut raster = Raster::new(params.width, params.height, 1);
    let (x, y) = trunk_base(params.width, params.height);
    draw_tree(&mut raster, 0, x, y, params.angle, params.recursions as i64, params);
    Ok(raster)
}

/// Stack of `slices` trees; slice `i` (from 0) is grown with `i + 1` levels.
///
/// Every other field of `params` applies to all slices; `recursions` is
/// replaced by the slice level.
pub fn fractal_tree_stack(params: &FractalTreeParams, slices: usize) -> Result<Raster<u8>> {
    if params.width == 0 || params.height == 0 || slices == 0 {
        return Err(Error::InvalidDimensions {
            width: params.width,
            height: params.height,
            depth: slices,
        });
    }
    let mut raster = Raster::new(params.width, params.height, slices);
    let (x, y) = trunk_base(params.width, params.height);
    for z in 0..slices {
        draw_tree(&mut raster, z, x, y, params.angle, z as i64 + 1, params);
    }
    Ok(raster)
}

fn trunk_base(width: usize, height: usize) -> (i64, i64) {
    ((width / 2) as i64, height as i64 - 10)
}

fn draw_tree(
    raster: &mut Raster<u8>,
    z: usize,
    x1: i64,
    y1: i64,
    angle: f64,
    level: i64,
    params: &FractalTreeParams,
) {
    if level < 0 {
        return;
    }
    let reach = level as f64 * params.segment_length;
    let rad = angle.to_radians();
    // truncation toward zero keeps the drawing symmetric about the trunk
    let x2 = x1 + (rad.cos() * reach) as i64;
    let y2 = y1 + (rad.sin() * reach) as i64;
    draw_line(raster, z, (x1, y1), (x2, y2), 255);
    draw_tree(raster, z, x2, y2, angle - params.spread, level - 1, params);
    draw_tree(raster, z, x2, y2, angle + params.spread, level - 1, params);
}

/// Bresenham line in slice `z`; pixels outside the raster are skipped
pub fn draw_line(raster: &mut Raster<u8>, z: usize, from: (i64, i64), to: (i64, i64), value: u8) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x >= 0 && y >= 0 {
            let _ = raster.set(x as usize, y as usize, z, value);
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
