//! Scalar field storage for one vertical slab
//!
//! A slab stores `nz + 1` horizontal planes of `nx × ny` values. Plane `k = 0` is
//! the ghost plane received from the slab below, planes `1..nz` are owned, and
//! plane `nz` is the overlap plane shared with the slab above (or the physical
//! top boundary on the topmost slab).

use serde::{Deserialize, Serialize};

/// Local grid extents of a slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    /// Streamwise cell count
    pub nx: usize,
    /// Spanwise cell count
    pub ny: usize,
    /// Index of the top plane; the slab stores planes `0..=nz`
    pub nz: usize,
}

impl GridDims {
    /// Create grid extents
    #[must_use]
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Number of values in one horizontal plane
    #[must_use]
    pub const fn plane_len(&self) -> usize {
        self.nx * self.ny
    }

    /// Number of stored planes, ghosts included
    #[must_use]
    pub const fn stored_planes(&self) -> usize {
        self.nz + 1
    }

    /// Total number of stored values
    #[must_use]
    pub const fn len(&self) -> usize {
        self.plane_len() * self.stored_planes()
    }

    /// True when the grid holds no cells
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GridDims {
    fn default() -> Self {
        Self::new(32, 32, 17)
    }
}

/// One scalar quantity over a slab
///
/// Stored as a flat `Vec<f64>`: `index = k * (nx * ny) + j * nx + i`, with
/// 0-based `i`, `j` and `k = 0..=nz`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field3 {
    data: Vec<f64>,
    dims: GridDims,
}

impl Field3 {
    /// Create a zero-initialised field
    #[must_use]
    pub fn new(dims: GridDims) -> Self {
        Self::with_value(dims, 0.0)
    }

    /// Create a field with every value set to `value`
    #[must_use]
    pub fn with_value(dims: GridDims, value: f64) -> Self {
        Self {
            data: vec![value; dims.len()],
            dims,
        }
    }

    /// Create a field by evaluating `f(i, j, k)` at every stored cell
    #[must_use]
    pub fn from_fn(dims: GridDims, mut f: impl FnMut(usize, usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(dims.len());
        for k in 0..dims.stored_planes() {
            for j in 0..dims.ny {
                for i in 0..dims.nx {
                    data.push(f(i, j, k));
                }
            }
        }
        Self { data, dims }
    }

    /// Grid extents of this field
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        k * self.dims.plane_len() + j * self.dims.nx + i
    }

    /// Value at a cell
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the stored planes
    #[must_use]
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        assert!(
            i < self.dims.nx && j < self.dims.ny && k <= self.dims.nz,
            "Coordinates out of bounds"
        );
        self.data[self.index(i, j, k)]
    }

    /// Set the value at a cell
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the stored planes
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        assert!(
            i < self.dims.nx && j < self.dims.ny && k <= self.dims.nz,
            "Coordinates out of bounds"
        );
        let idx = self.index(i, j, k);
        self.data[idx] = value;
    }

    /// Fill every stored value, ghosts included
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Read-only view of all stored values
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable view of all stored values
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Horizontal plane `k`
    #[must_use]
    pub fn plane(&self, k: usize) -> &[f64] {
        let n = self.dims.plane_len();
        &self.data[k * n..(k + 1) * n]
    }

    /// Mutable horizontal plane `k`
    pub fn plane_mut(&mut self, k: usize) -> &mut [f64] {
        let n = self.dims.plane_len();
        &mut self.data[k * n..(k + 1) * n]
    }

    /// Overwrite plane `dst` with a copy of plane `src`
    pub fn copy_plane(&mut self, src: usize, dst: usize) {
        let n = self.dims.plane_len();
        self.data.copy_within(src * n..(src + 1) * n, dst * n);
    }

    /// Set every value of plane `k`
    pub fn fill_plane(&mut self, k: usize, value: f64) {
        self.plane_mut(k).fill(value);
    }

    /// True when every stored value is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Largest absolute value over the stored planes
    #[must_use]
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = Field3::new(GridDims::new(4, 3, 5));
        assert_eq!(field.as_slice().len(), 4 * 3 * 6);
        assert!(field.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_field_get_set_layout() {
        let mut field = Field3::new(GridDims::new(4, 3, 2));
        field.set(1, 2, 1, 7.5);
        assert_eq!(field.get(1, 2, 1), 7.5);
        // k * (nx * ny) + j * nx + i
        assert_eq!(field.as_slice()[12 + 2 * 4 + 1], 7.5);
    }

    #[test]
    fn test_copy_and_fill_plane() {
        let dims = GridDims::new(2, 2, 3);
        let mut field = Field3::from_fn(dims, |i, j, k| (100 * k + 10 * j + i) as f64);
        field.copy_plane(2, 3);
        assert_eq!(field.plane(3), field.plane(2));
        field.fill_plane(0, -1.0);
        assert!(field.plane(0).iter().all(|&v| v == -1.0));
        assert_eq!(field.get(1, 1, 1), 111.0);
    }

    #[test]
    fn test_max_abs() {
        let mut field = Field3::new(GridDims::new(3, 3, 2));
        field.set(2, 0, 1, -4.0);
        field.set(0, 1, 2, 3.0);
        assert_eq!(field.max_abs(), 4.0);
    }

    #[test]
    #[should_panic(expected = "Coordinates out of bounds")]
    fn test_field_bounds_check() {
        let field = Field3::new(GridDims::new(4, 4, 4));
        let _ = field.get(0, 0, 5);
    }
}
