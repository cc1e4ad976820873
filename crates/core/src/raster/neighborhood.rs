//! Voxel positions and neighbourhood patterns for grid traversal

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Integer voxel position in a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Voxel {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Voxel {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Neighbour at a signed offset, `None` if any coordinate would go negative
    pub fn offset(&self, dx: isize, dy: isize, dz: isize) -> Option<Voxel> {
        Some(Voxel {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
            z: self.z.checked_add_signed(dz)?,
        })
    }

    /// Signed delta from `self` to `other`
    pub fn delta(&self, other: &Voxel) -> (isize, isize, isize) {
        (
            other.x as isize - self.x as isize,
            other.y as isize - self.y as isize,
            other.z as isize - self.z as isize,
        )
    }

    /// Whether two voxels touch in the 26-neighbourhood (and are distinct)
    pub fn touches(&self, other: &Voxel) -> bool {
        let (dx, dy, dz) = self.delta(other);
        self != other && dx.abs() <= 1 && dy.abs() <= 1 && dz.abs() <= 1
    }
}

/// Scan order: slice, then row, then column
impl Ord for Voxel {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.z, self.y, self.x).cmp(&(other.z, other.y, other.x))
    }
}

impl PartialOrd for Voxel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Axis-aligned rectangle in the XY plane.
///
/// Applied to every slice of a stack, so in 3D it selects a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether a voxel's XY position lies inside the rectangle
    pub fn contains(&self, voxel: &Voxel) -> bool {
        voxel.x >= self.x
            && voxel.y >= self.y
            && voxel.x < self.x + self.width
            && voxel.y < self.y + self.height
    }

    /// Whether a voxel lies on the rectangle's outline
    pub fn is_border(&self, voxel: &Voxel) -> bool {
        if !self.contains(voxel) {
            return false;
        }
        voxel.x == self.x
            || voxel.y == self.y
            || voxel.x + 1 == self.x + self.width
            || voxel.y + 1 == self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Voxel adjacency used when walking the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Face neighbours only
    Face6,
    /// Face and edge neighbours
    Edge18,
    /// Face, edge and corner neighbours
    #[default]
    Vertex26,
}

impl Connectivity {
    /// Whether an offset in {-1,0,1}^3 is a neighbour under this connectivity
    pub fn includes(&self, dx: isize, dy: isize, dz: isize) -> bool {
        let manhattan = dx.abs() + dy.abs() + dz.abs();
        if manhattan == 0 {
            return false;
        }
        match self {
            Connectivity::Face6 => manhattan == 1,
            Connectivity::Edge18 => manhattan <= 2,
            Connectivity::Vertex26 => true,
        }
    }

    /// Neighbour offsets `(dx, dy, dz)` in scan order
    pub fn offsets(&self) -> Vec<(isize, isize, isize)> {
        let mut offsets = Vec::with_capacity(26);
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if self.includes(dx, dy, dz) {
                        offsets.push((dx, dy, dz));
                    }
                }
            }
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_counts() {
        assert_eq!(Connectivity::Face6.offsets().len(), 6);
        assert_eq!(Connectivity::Edge18.offsets().len(), 18);
        assert_eq!(Connectivity::Vertex26.offsets().len(), 26);
    }

    #[test]
    fn test_offsets_scan_order() {
        let offs = Connectivity::Vertex26.offsets();
        assert_eq!(offs.first(), Some(&(-1, -1, -1)));
        assert_eq!(offs.last(), Some(&(1, 1, 1)));
        assert!(!offs.contains(&(0, 0, 0)));
    }

    #[test]
    fn test_voxel_ordering() {
        let mut v = vec![
            Voxel::new(0, 0, 1),
            Voxel::new(5, 0, 0),
            Voxel::new(0, 1, 0),
            Voxel::new(1, 0, 0),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                Voxel::new(1, 0, 0),
                Voxel::new(5, 0, 0),
                Voxel::new(0, 1, 0),
                Voxel::new(0, 0, 1)
            ]
        );
    }

    #[test]
    fn test_voxel_offset_and_touch() {
        let v = Voxel::new(0, 2, 0);
        assert_eq!(v.offset(-1, 0, 0), None);
        assert_eq!(v.offset(1, -1, 0), Some(Voxel::new(1, 1, 0)));
        assert!(v.touches(&Voxel::new(1, 3, 1)));
        assert!(!v.touches(&Voxel::new(2, 2, 0)));
        assert!(!v.touches(&v));
    }

    #[test]
    fn test_rect_border() {
        let r = Rect::new(2, 2, 3, 3);
        assert!(r.contains(&Voxel::new(2, 2, 0)));
        assert!(r.contains(&Voxel::new(4, 4, 7)));
        assert!(!r.contains(&Voxel::new(5, 4, 0)));
        assert!(r.is_border(&Voxel::new(2, 3, 0)));
        assert!(r.is_border(&Voxel::new(4, 3, 0)));
        assert!(!r.is_border(&Voxel::new(3, 3, 0)));
        assert!(!r.is_border(&Voxel::new(1, 3, 0)));
    }
}
