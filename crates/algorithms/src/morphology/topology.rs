//! Local topology of a voxel's 3x3x3 neighbourhood
//!
//! Simple-point characterisation by topological numbers: a foreground voxel
//! can be removed without changing topology iff its 26-neighbourhood holds
//! exactly one 26-connected foreground component and exactly one
//! 6-connected background component (taken inside the 18-neighbourhood)
//! that touches a face neighbour. Voxels outside the raster count as
//! background.

use arbor_core::{Raster, RasterElement, Voxel};

const CENTER: usize = 13;

/// Linear index in the 3x3x3 cube for an offset in {-1,0,1}^3
#[inline]
fn cube_index(dx: isize, dy: isize, dz: isize) -> usize {
    ((dz + 1) * 9 + (dy + 1) * 3 + (dx + 1)) as usize
}

#[inline]
fn cube_offset(i: usize) -> (isize, isize, isize) {
    let i = i as isize;
    (i % 3 - 1, (i / 3) % 3 - 1, i / 9 - 1)
}

/// Foreground occupancy of the 3x3x3 cube centred on a voxel
#[derive(Debug, Clone, Copy)]
pub struct Cube([bool; 27]);

impl Cube {
    /// Sample the cube around `v`, treating out-of-bounds as background
    pub fn gather<T: RasterElement>(raster: &Raster<T>, v: Voxel) -> Self {
        let mut cells = [false; 27];
        let (x, y, z) = (v.x as isize, v.y as isize, v.z as isize);
        for (i, cell) in cells.iter_mut().enumerate() {
            let (dx, dy, dz) = cube_offset(i);
            *cell = raster.get_or_zero(x + dx, y + dy, z + dz).is_set();
        }
        Self(cells)
    }

    /// Number of foreground voxels among the 26 neighbours
    pub fn neighbours(&self) -> usize {
        self.0
            .iter()
            .enumerate()
            .filter(|&(i, &set)| i != CENTER && set)
            .count()
    }

    /// Foreground test for the neighbour at an offset
    pub fn is_set(&self, dx: isize, dy: isize, dz: isize) -> bool {
        self.0[cube_index(dx, dy, dz)]
    }

    /// 26-connected foreground components among the 26 neighbours
    pub fn foreground_components(&self) -> usize {
        let mut seen = [false; 27];
        seen[CENTER] = true;
        let mut components = 0;
        for start in 0..27 {
            if seen[start] || !self.0[start] {
                continue;
            }
            components += 1;
            flood(&mut seen, start, |i, j| {
                self.0[j] && adjacent26(i, j)
            });
        }
        components
    }

    /// 6-connected background components inside the 18-neighbourhood that
    /// touch at least one face neighbour
    pub fn background_components(&self) -> usize {
        let mut seen = [false; 27];
        seen[CENTER] = true;
        for (i, s) in seen.iter_mut().enumerate() {
            if self.0[i] || !in_n18(i) {
                *s = true;
            }
        }
        let mut components = 0;
        for start in FACES {
            if seen[start] {
                continue;
            }
            components += 1;
            flood(&mut seen, start, |i, j| adjacent6(i, j));
        }
        components
    }

    /// Whether removing the centre voxel preserves local topology
    pub fn is_simple(&self) -> bool {
        self.foreground_components() == 1 && self.background_components() == 1
    }
}

const FACES: [usize; 6] = [4, 10, 12, 14, 16, 22];

fn in_n18(i: usize) -> bool {
    let (dx, dy, dz) = cube_offset(i);
    dx.abs() + dy.abs() + dz.abs() <= 2
}

fn adjacent26(i: usize, j: usize) -> bool {
    let (ax, ay, az) = cube_offset(i);
    let (bx, by, bz) = cube_offset(j);
    i != j && (ax - bx).abs() <= 1 && (ay - by).abs() <= 1 && (az - bz).abs() <= 1
}

fn adjacent6(i: usize, j: usize) -> bool {
    let (ax, ay, az) = cube_offset(i);
    let (bx, by, bz) = cube_offset(j);
    (ax - bx).abs() + (ay - by).abs() + (az - bz).abs() == 1
}

/// Mark everything reachable from `start` through unseen cells accepted by `link`
fn flood(seen: &mut [bool; 27], start: usize, link: impl Fn(usize, usize) -> bool) {
    let mut stack = vec![start];
    seen[start] = true;
    while let Some(i) = stack.pop() {
        for j in 0..27 {
            if !seen[j] && link(i, j) {
                seen[j] = true;
                stack.push(j);
            }
        }
    }
}

/// Foreground neighbour count of a voxel
pub fn neighbour_count<T: RasterElement>(raster: &Raster<T>, v: Voxel) -> usize {
    Cube::gather(raster, v).neighbours()
}
