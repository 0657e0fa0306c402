//! # Blocked Matrix Multiplication
//!
//! Computes `C = A * B` for row-major matrices by walking the iteration space
//! in square tiles of edge `sz_block`:
//!
//! 1. Loop `i_row_blk` over rows of `A` and `C` in `sz_block` steps. This is
//!    the parallel loop: each step owns one band of rows of `C`.
//! 2. Loop `j_col_blk` over columns of `B` and `C` in `sz_block` steps.
//! 3. Loop `k_col_blk` over the reduction dimension in `sz_block` steps and
//!    hand the tile triple to [`kernel::accumulate`], which clips it at the
//!    matrix edges.
//!
//! Distinct row bands are distinct sub-slices of `C`, so parallel tasks never
//! write the same element. The reduction loop for a given tile of `C` always
//! runs inside a single task, in order.

use rayon::iter::ParallelIterator;
use rayon::ThreadPoolBuilder;
use tracing::{debug_span, trace};

use crate::config::{MatMulConfig, Parallelism};
use crate::error::{dimension_mismatch, Result};
use crate::kernel;
use crate::matrix::{Matrix, RowBandMut, Scalar};

/// Matrix multiplication `C = A * B` with the default configuration
/// (block edge [`crate::SZ_BLOCK`], parallel over row blocks, global pool).
///
/// # Errors
/// Returns [`crate::MatMulError::DimensionMismatch`] when
/// `a.ncols() != b.nrows()`. Nothing is computed in that case.
pub fn multiply<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>> {
    multiply_with(a, b, &MatMulConfig::default())
}

/// Matrix multiplication `C = A * B` with an explicit configuration.
///
/// # Arguments
/// * `a` - Left operand, `m x k`.
/// * `b` - Right operand, `k x n`.
/// * `config` - Block size, parallelism and optional dedicated pool size.
///
/// # Returns
/// A freshly allocated `m x n` matrix. Zero-sized dimensions are valid and
/// give an empty (or all-zero, when only `k == 0`) result.
///
/// # Errors
/// * [`crate::MatMulError::DimensionMismatch`] when `a.ncols() != b.nrows()`.
/// * [`crate::MatMulError::ThreadPool`] when `config.threads` is set and the
///   dedicated pool cannot be started.
///
/// # Performance
/// With `config.threads` set, a pool is created for this call only and its
/// workers are joined before returning.
pub fn multiply_with<T: Scalar>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    config: &MatMulConfig,
) -> Result<Matrix<T>> {
    if a.ncols() != b.nrows() {
        return Err(dimension_mismatch(a.shape(), b.shape()));
    }

    let (m, k, n) = (a.nrows(), a.ncols(), b.ncols());
    let sz_block = config.block.size();

    let span = debug_span!(
        "multiply",
        m,
        k,
        n,
        sz_block,
        parallelism = ?config.parallelism,
        threads = ?config.threads
    );
    let _enter = span.enter();

    let mut c = Matrix::zeros(m, n);
    if m == 0 || n == 0 || k == 0 {
        trace!("degenerate shape, no block to compute");
        return Ok(c);
    }

    match (config.parallelism, config.threads) {
        (Parallelism::Sequential, _) => {
            for mut band in c.row_bands_mut(sz_block) {
                multiply_band(a, b, &mut band, sz_block);
            }
        }
        (Parallelism::Parallel, None) => par_multiply_bands(a, b, &mut c, sz_block),
        (Parallelism::Parallel, Some(threads)) => {
            let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
            pool.install(|| par_multiply_bands(a, b, &mut c, sz_block));
        }
    }

    Ok(c)
}

/// Fork-join over row bands; returns once every band is done.
fn par_multiply_bands<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>, c: &mut Matrix<T>, sz_block: usize) {
    c.par_row_bands_mut(sz_block)
        .for_each(|mut band| multiply_band(a, b, &mut band, sz_block));
}

/// All tile triples whose output rows fall in `band`.
fn multiply_band<T: Scalar>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    band: &mut RowBandMut<'_, T>,
    sz_block: usize,
) {
    let i_row_blk = band.row_start();
    trace!(i_row_blk, rows = band.nrows(), "row band");

    for j_col_blk in (0..b.ncols()).step_by(sz_block) {
        for k_col_blk in (0..a.ncols()).step_by(sz_block) {
            kernel::accumulate(i_row_blk, j_col_blk, k_col_blk, sz_block, a, b, band);
        }
    }
}

impl<T: Scalar> Matrix<T> {
    /// `self * rhs` with the default configuration, see [`multiply`].
    pub fn matmul(&self, rhs: &Matrix<T>) -> Result<Matrix<T>> {
        multiply(self, rhs)
    }

    /// `self * rhs` with an explicit configuration, see [`multiply_with`].
    pub fn matmul_with(&self, rhs: &Matrix<T>, config: &MatMulConfig) -> Result<Matrix<T>> {
        multiply_with(self, rhs, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatMulError;
    use crate::naive::multiply_naive;
    use approx::assert_relative_eq;

    fn config(sz_block: usize, parallelism: Parallelism) -> MatMulConfig {
        MatMulConfig::default()
            .with_block_size(sz_block)
            .unwrap()
            .with_parallelism(parallelism)
    }

    /// Values (row+1) + (col+1)*0.1 for easy verification.
    fn create_test_matrix(rows: usize, cols: usize) -> Matrix<f64> {
        Matrix::from_fn(rows, cols, |i, j| (i + 1) as f64 + (j + 1) as f64 * 0.1)
    }

    fn assert_matrix_relative_eq(actual: &Matrix<f64>, expected: &Matrix<f64>) {
        assert_eq!(actual.shape(), expected.shape());
        for (x, y) in actual.iter().zip(expected.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_multiply_2x2() {
        // | 1 2 |   | 5 6 |   | 19 22 |
        // | 3 4 | * | 7 8 | = | 43 50 |
        let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();

        for sz_block in [1, 2, 64] {
            for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
                let c = multiply_with(&a, &b, &config(sz_block, parallelism)).unwrap();
                assert_eq!(
                    c.as_slice(),
                    &[19.0, 22.0, 43.0, 50.0],
                    "sz_block={}, {:?}",
                    sz_block,
                    parallelism
                );
            }
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Matrix::<f64>::zeros(2, 3);
        let b = Matrix::<f64>::zeros(2, 2);

        let err = multiply(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            MatMulError::DimensionMismatch {
                lhs_rows: 2,
                lhs_cols: 3,
                rhs_rows: 2,
                rhs_cols: 2
            }
        ));
    }

    #[test]
    fn test_empty_reduction_dimension() {
        let a = Matrix::<f32>::zeros(3, 0);
        let b = Matrix::<f32>::zeros(0, 3);

        let c = multiply(&a, &b).unwrap();
        assert_eq!(c.shape(), (3, 3));
        assert!(c.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_outer_dimensions() {
        let a = Matrix::<f64>::zeros(0, 4);
        let b = Matrix::<f64>::zeros(4, 5);
        let c = multiply(&a, &b).unwrap();
        assert_eq!(c.shape(), (0, 5));
        assert!(c.is_empty());

        let a = Matrix::<f64>::zeros(2, 1);
        let b = Matrix::<f64>::zeros(1, 0);
        let c = multiply(&a, &b).unwrap();
        assert_eq!(c.shape(), (2, 0));
        assert!(c.is_empty());
    }

    #[test]
    fn test_matches_naive_on_odd_dimensions() {
        // None of the dimensions is a multiple of the block sizes below.
        let a = create_test_matrix(37, 23);
        let b = create_test_matrix(23, 41);
        let expected = multiply_naive(&a, &b).unwrap();

        for sz_block in [1, 3, 7, 16, 64, 1000, usize::MAX] {
            for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
                let c = multiply_with(&a, &b, &config(sz_block, parallelism)).unwrap();
                assert_matrix_relative_eq(&c, &expected);
            }
        }
    }

    #[test]
    fn test_sequential_and_parallel_agree_exactly() {
        // Same tile order per output element, so results are bit-identical.
        let a = create_test_matrix(70, 33);
        let b = create_test_matrix(33, 50);

        let seq = multiply_with(&a, &b, &config(8, Parallelism::Sequential)).unwrap();
        let par = multiply_with(&a, &b, &config(8, Parallelism::Parallel)).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_dedicated_pool() {
        let a = create_test_matrix(20, 10);
        let b = create_test_matrix(10, 15);
        let cfg = config(4, Parallelism::Parallel).with_threads(2);

        let c = multiply_with(&a, &b, &cfg).unwrap();
        let expected = multiply_naive(&a, &b).unwrap();
        assert_matrix_relative_eq(&c, &expected);
    }

    #[test]
    fn test_matmul_method() {
        let a = create_test_matrix(4, 4);
        let identity = Matrix::identity(4);

        assert_eq!(a.matmul(&identity).unwrap(), a);
        assert_eq!(
            identity
                .matmul_with(&a, &MatMulConfig::sequential())
                .unwrap(),
            a
        );
    }

    #[test]
    fn test_extreme_aspect_ratios() {
        // Tall times wide: 8x1 * 1x9 -> outer product.
        let a = Matrix::from_fn(8, 1, |i, _| (i + 1) as f64);
        let b = Matrix::from_fn(1, 9, |_, j| (j + 1) as f64);

        let c = multiply_with(&a, &b, &config(3, Parallelism::Parallel)).unwrap();
        for i in 0..8 {
            for j in 0..9 {
                assert_eq!(c[(i, j)], ((i + 1) * (j + 1)) as f64);
            }
        }

        // Wide times tall: 1x50 * 50x1 -> dot product.
        let a = Matrix::from_elem(1, 50, 2.0);
        let b = Matrix::from_elem(50, 1, 0.5);
        let c = multiply_with(&a, &b, &config(7, Parallelism::Parallel)).unwrap();
        assert_eq!(c.as_slice(), &[50.0]);
    }
}
