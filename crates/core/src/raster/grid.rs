//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{Calibration, RasterElement, Voxel};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut3, Axis};

/// A calibrated 3D voxel grid. 2D images are single-slice rasters.
///
/// `Raster<T>` stores values of type `T` in a `(z, y, x)` array with
/// associated spatial calibration. Iteration order over the underlying
/// array is scan order: slice, then row, then column.
///
/// # Type Parameters
///
/// - `T`: The voxel value type, must implement [`RasterElement`]
///
/// # Example
///
/// ```ignore
/// use arbor_core::Raster;
///
/// // 100x80 image with a single slice
/// let mut raster: Raster<u8> = Raster::new(100, 80, 1);
///
/// raster.set(10, 20, 0, 255)?;
/// let value = raster.get(10, 20, 0)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Voxel data stored as (z, y, x)
    data: Array3<T>,
    /// Voxel spacing and unit
    calibration: Calibration,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            data: Array3::zeros((depth, height, width)),
            calibration: Calibration::default(),
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(width: usize, height: usize, depth: usize, value: T) -> Self {
        Self {
            data: Array3::from_elem((depth, height, width), value),
            calibration: Calibration::default(),
        }
    }

    /// Create a raster from voxel values in scan order
    pub fn from_vec(data: Vec<T>, width: usize, height: usize, depth: usize) -> Result<Self> {
        if data.len() != width * height * depth {
            return Err(Error::InvalidDimensions {
                width,
                height,
                depth,
            });
        }

        let array = Array3::from_shape_vec((depth, height, width), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data: array,
            calibration: Calibration::default(),
        })
    }

    /// Create a raster from an ndarray laid out as (z, y, x)
    pub fn from_array(data: Array3<T>) -> Self {
        Self {
            data,
            calibration: Calibration::default(),
        }
    }

    /// Create a single-slice raster from a (y, x) array
    pub fn from_array2(data: Array2<T>) -> Self {
        Self::from_array(data.insert_axis(Axis(0)))
    }

    /// Attach a calibration, consuming the raster
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Create a zeroed raster with the same shape and calibration but a different type
    pub fn with_same_meta<U: RasterElement>(&self) -> Raster<U> {
        Raster {
            data: Array3::zeros(self.data.dim()),
            calibration: self.calibration.clone(),
        }
    }

    /// Create a raster with the same dimensions and calibration, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array3::from_elem(self.data.dim(), fill_value),
            calibration: self.calibration.clone(),
        }
    }

    // Dimensions

    /// Number of columns
    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Number of slices
    pub fn depth(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Dimensions as (width, height, depth)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.width(), self.height(), self.depth())
    }

    /// Total number of voxels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster has no voxels
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the raster has more than one slice
    pub fn is_3d(&self) -> bool {
        self.depth() > 1
    }

    /// Whether signed coordinates fall inside the grid
    pub fn contains(&self, x: isize, y: isize, z: isize) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.width()
            && (y as usize) < self.height()
            && (z as usize) < self.depth()
    }

    // Data access

    /// Get value at (x, y, z)
    pub fn get(&self, x: usize, y: usize, z: usize) -> Result<T> {
        self.data
            .get((z, y, x))
            .copied()
            .ok_or_else(|| self.out_of_bounds(x, y, z))
    }

    /// Get value at signed coordinates, zero outside the grid
    pub fn get_or_zero(&self, x: isize, y: isize, z: isize) -> T {
        if self.contains(x, y, z) {
            self.data[(z as usize, y as usize, x as usize)]
        } else {
            T::zero()
        }
    }

    /// Value at a voxel position
    pub fn at(&self, voxel: Voxel) -> T {
        self.get_or_zero(voxel.x as isize, voxel.y as isize, voxel.z as isize)
    }

    /// Set value at (x, y, z)
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) -> Result<()> {
        if x >= self.width() || y >= self.height() || z >= self.depth() {
            return Err(self.out_of_bounds(x, y, z));
        }
        self.data[(z, y, x)] = value;
        Ok(())
    }

    /// Set value at a voxel position, ignoring positions outside the grid
    pub fn put(&mut self, voxel: Voxel, value: T) {
        if let Some(v) = self.data.get_mut((voxel.z, voxel.y, voxel.x)) {
            *v = value;
        }
    }

    fn out_of_bounds(&self, x: usize, y: usize, z: usize) -> Error {
        Error::IndexOutOfBounds {
            x,
            y,
            z,
            width: self.width(),
            height: self.height(),
            depth: self.depth(),
        }
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array3<T> {
        &mut self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array3<T> {
        self.data
    }

    /// View of a single slice as (y, x)
    pub fn slice(&self, z: usize) -> Result<ArrayView2<'_, T>> {
        if z >= self.depth() {
            return Err(self.out_of_bounds(0, 0, z));
        }
        Ok(self.data.index_axis(Axis(0), z))
    }

    // Metadata

    /// Voxel spacing and unit
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    // Voxel indexing

    /// Linear scan-order index of a voxel
    pub fn index_of(&self, voxel: Voxel) -> usize {
        (voxel.z * self.height() + voxel.y) * self.width() + voxel.x
    }

    /// Voxel at a linear scan-order index
    pub fn voxel_at(&self, index: usize) -> Voxel {
        let plane = self.width() * self.height();
        let z = index / plane;
        let rem = index % plane;
        Voxel::new(rem % self.width(), rem / self.width(), z)
    }

    /// Foreground voxels in scan order
    pub fn foreground(&self) -> Vec<Voxel> {
        self.data
            .indexed_iter()
            .filter(|(_, v)| v.is_set())
            .map(|((z, y, x), _)| Voxel::new(x, y, z))
            .collect()
    }

    /// Number of foreground voxels
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|v| v.is_set()).count()
    }

    /// Whether no voxel is foreground
    pub fn is_blank(&self) -> bool {
        !self.data.iter().any(|v| v.is_set())
    }

    /// Maximum intensity projection along Z
    pub fn z_max_projection(&self) -> Raster<T> {
        let mut out = Array3::zeros((1, self.height(), self.width()));
        for slice in self.data.axis_iter(Axis(0)) {
            out.index_axis_mut(Axis(0), 0)
                .zip_mut_with(&slice, |o, &v| {
                    if v > *o {
                        *o = v;
                    }
                });
        }
        Raster {
            data: out,
            calibration: self.calibration.clone(),
        }
    }

    /// Binary copy with every foreground voxel set to `value`
    pub fn binarize(&self, value: u8) -> Raster<u8> {
        Raster {
            data: self.data.mapv(|v| if v.is_set() { value } else { 0 }),
            calibration: self.calibration.clone(),
        }
    }
}
