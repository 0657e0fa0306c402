//! # Dense Row-Major Matrices
//!
//! [`Matrix`] is the container consumed and produced by the multiplication
//! routines. Elements are stored in a single contiguous buffer in **row-major**
//! order, so a row of the matrix is a contiguous slice. The blocked kernel
//! relies on this: its innermost loop walks one row of `B` and one row of `C`
//! sequentially.
//!
//! [`RowBandMut`] is a mutable view over a horizontal band of rows. Splitting
//! the output into bands is how parallel workers obtain exclusive, disjoint
//! write access to `C` without any locking.

use std::fmt::Debug;
use std::ops::{Index, IndexMut, Range};

use ndarray::Array2;
use num::Float;
use rand::distr::uniform::SampleUniform;
use rand::Rng;
use rayon::iter::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSliceMut;

use crate::error::{MatMulError, Result};

/// Element types accepted by the multiplication routines.
///
/// Blanket-implemented for every floating-point type that can be shared
/// across worker threads (`f32` and `f64` in practice).
pub trait Scalar: Float + Send + Sync + Debug + 'static {}

impl<T: Float + Send + Sync + Debug + 'static> Scalar for T {}

/// Calculates the 1D index for a 2D element in row-major order.
///
/// # Arguments
/// * `i` - Row index.
/// * `j` - Column index.
/// * `ld` - Leading dimension (number of columns for row-major).
#[inline(always)]
fn at(i: usize, j: usize, ld: usize) -> usize {
    (i * ld) + j
}

/// A dense, row-major matrix of floating-point elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    /// Creates a `rows x cols` matrix with every element set to `value`.
    pub fn from_elem(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Creates a `rows x cols` matrix filled with the additive identity.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::from_elem(rows, cols, T::zero())
    }

    /// Creates the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix[(i, i)] = T::one();
        }
        matrix
    }

    /// Wraps a row-major buffer.
    ///
    /// # Errors
    /// Returns [`MatMulError::ShapeMismatch`] if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatMulError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix by evaluating `f(i, j)` for every element, row by row.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Builds a matrix whose elements are drawn uniformly from `[low, high)`.
    ///
    /// # Panics
    /// Panics if `low >= high` (see [`Rng::random_range`]).
    pub fn random<R>(rows: usize, cols: usize, low: T, high: T, rng: &mut R) -> Self
    where
        T: SampleUniform,
        R: Rng,
    {
        Self::from_fn(rows, cols, |_, _| rng.random_range(low..high))
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// True when the matrix holds no element (a zero-sized dimension).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The row-major element buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consumes the matrix and returns its row-major element buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Row `i` as a contiguous slice.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        assert!(i < self.rows, "row {} out of bounds ({} rows)", i, self.rows);
        let start = at(i, 0, self.cols);
        &self.data[start..start + self.cols]
    }

    /// Element `(i, j)`, or `None` when out of bounds.
    pub fn get(&self, i: usize, j: usize) -> Option<T> {
        if i < self.rows && j < self.cols {
            Some(self.data[at(i, j, self.cols)])
        } else {
            None
        }
    }

    /// Iterates over all elements in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.data.iter()
    }

    /// Splits the matrix into consecutive bands of `band_rows` rows.
    ///
    /// The last band is shorter when `nrows` is not a multiple of `band_rows`.
    /// A `band_rows` larger than `nrows` gives a single band. A matrix without
    /// elements yields no band.
    ///
    /// # Panics
    /// Panics if `band_rows == 0`.
    pub fn row_bands_mut(&mut self, band_rows: usize) -> impl Iterator<Item = RowBandMut<'_, T>> {
        assert!(band_rows > 0, "band_rows must be at least 1");
        let (band_rows, cols) = (band_rows.min(self.rows.max(1)), self.cols);
        self.data
            .chunks_mut(band_rows.saturating_mul(cols.max(1)))
            .enumerate()
            .map(move |(idx, data)| RowBandMut::new(idx * band_rows, cols, data))
    }

    /// Parallel counterpart of [`Matrix::row_bands_mut`].
    ///
    /// Bands are disjoint sub-slices of the buffer, so every worker owns the
    /// rows it writes.
    ///
    /// # Panics
    /// Panics if `band_rows == 0`.
    pub fn par_row_bands_mut(
        &mut self,
        band_rows: usize,
    ) -> impl IndexedParallelIterator<Item = RowBandMut<'_, T>> {
        assert!(band_rows > 0, "band_rows must be at least 1");
        let (band_rows, cols) = (band_rows.min(self.rows.max(1)), self.cols);
        self.data
            .par_chunks_mut(band_rows.saturating_mul(cols.max(1)))
            .enumerate()
            .map(move |(idx, data)| RowBandMut::new(idx * band_rows, cols, data))
    }

    /// Copies the matrix into an [`ndarray::Array2`].
    pub fn to_ndarray(&self) -> Array2<T> {
        Array2::from_shape_fn(self.shape(), |(i, j)| self[(i, j)])
    }
}

impl<T: Scalar> From<Array2<T>> for Matrix<T> {
    fn from(array: Array2<T>) -> Self {
        let (rows, cols) = array.dim();
        // `iter` visits elements in logical row-major order for any memory layout.
        let data = array.iter().copied().collect();
        Self { rows, cols, data }
    }
}

impl<T: Scalar> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            i,
            j,
            self.rows,
            self.cols
        );
        &self.data[at(i, j, self.cols)]
    }
}

impl<T: Scalar> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            i,
            j,
            self.rows,
            self.cols
        );
        &mut self.data[at(i, j, self.cols)]
    }
}

/// Exclusive view over rows `[row_start, row_start + nrows)` of a matrix.
///
/// Rows are addressed with their **global** index, so code running on a band
/// uses the same coordinates as code running on the whole matrix. Touching a
/// row outside the band panics.
#[derive(Debug)]
pub struct RowBandMut<'a, T> {
    row_start: usize,
    rows: usize,
    cols: usize,
    data: &'a mut [T],
}

impl<'a, T: Scalar> RowBandMut<'a, T> {
    fn new(row_start: usize, cols: usize, data: &'a mut [T]) -> Self {
        let rows = if cols == 0 { 0 } else { data.len() / cols };
        Self {
            row_start,
            rows,
            cols,
            data,
        }
    }

    /// Global index of the first row in the band.
    #[inline]
    pub fn row_start(&self) -> usize {
        self.row_start
    }

    /// Number of rows in the band.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Number of columns (same as the parent matrix).
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Global row indices covered by the band.
    pub fn row_range(&self) -> Range<usize> {
        self.row_start..self.row_start + self.rows
    }

    /// Mutable access to global row `i`.
    ///
    /// # Panics
    /// Panics if `i` lies outside [`RowBandMut::row_range`].
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        assert!(
            self.row_range().contains(&i),
            "row {} outside band {:?}",
            i,
            self.row_range()
        );
        let start = at(i - self.row_start, 0, self.cols);
        &mut self.data[start..start + self.cols]
    }
}

impl<T: Scalar> Index<(usize, usize)> for RowBandMut<'_, T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(
            self.row_range().contains(&i) && j < self.cols,
            "index ({}, {}) outside band {:?} x 0..{}",
            i,
            j,
            self.row_range(),
            self.cols
        );
        &self.data[at(i - self.row_start, j, self.cols)]
    }
}

impl<T: Scalar> IndexMut<(usize, usize)> for RowBandMut<'_, T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(
            self.row_range().contains(&i) && j < self.cols,
            "index ({}, {}) outside band {:?} x 0..{}",
            i,
            j,
            self.row_range(),
            self.cols
        );
        &mut self.data[at(i - self.row_start, j, self.cols)]
    }
}
