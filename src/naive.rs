//! Reference triple-loop product, used to validate the blocked path.

use crate::error::{dimension_mismatch, Result};
use crate::matrix::{Matrix, Scalar};

/// Naive O(mnk) multiplication `C = A * B` with a running sum per element.
///
/// # Errors
/// Returns [`crate::MatMulError::DimensionMismatch`] when
/// `a.ncols() != b.nrows()`.
pub fn multiply_naive<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>> {
    if a.ncols() != b.nrows() {
        return Err(dimension_mismatch(a.shape(), b.shape()));
    }

    let mut c = Matrix::zeros(a.nrows(), b.ncols());
    for i in 0..a.nrows() {
        for j in 0..b.ncols() {
            let mut sum = T::zero();
            for l in 0..a.ncols() {
                sum = sum + a[(i, l)] * b[(l, j)];
            }
            c[(i, j)] = sum;
        }
    }
    Ok(c)
}

/// Largest elementwise `|x - y|`; zero for empty matrices.
///
/// # Panics
/// Panics if the shapes differ.
pub fn max_abs_diff<T: Scalar>(x: &Matrix<T>, y: &Matrix<T>) -> T {
    assert_eq!(x.shape(), y.shape(), "shapes differ");
    x.iter()
        .zip(y.iter())
        .map(|(&p, &q)| (p - q).abs())
        .fold(T::zero(), T::max)
}
