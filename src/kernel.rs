//! # Sub-Block Kernel
//!
//! Scalar accumulation of one block triple:
//!
//! ```text
//! C(i, j) += Σ_k A(i, k) · B(k, j)
//!     i ∈ [row_start, min(m, row_start + sz))
//!     k ∈ [k_start,   min(k, k_start   + sz))
//!     j ∈ [col_start, min(n, col_start + sz))
//! ```
//!
//! The `min` clipping is what makes blocking correct for dimensions that are
//! not multiples of the block size: edge tiles are smaller, never skipped and
//! never read past the matrix.
//!
//! Loop order is `i`, `k`, `j`. For a fixed `(i, k)`, `A(i, k)` is a constant
//! and the innermost loop walks a row of `B` and a row of `C` contiguously,
//! which is the cache-friendly direction for row-major storage.

use std::cmp::min;

use crate::matrix::{Matrix, RowBandMut, Scalar};

/// Accumulates the product of the `(row_start, k_start)` tile of `a` and the
/// `(k_start, col_start)` tile of `b` into the `(row_start, col_start)` tile
/// of `c`.
///
/// # Arguments
/// * `row_start` - First row of the tile in `A` and `C`.
/// * `col_start` - First column of the tile in `B` and `C`.
/// * `k_start` - First index of the tile along the reduction dimension.
/// * `sz_block` - Tile edge length before clipping.
/// * `a`, `b` - Read-only operands.
/// * `c` - Band of the output that contains the tile rows.
///
/// # Panics
/// The caller guarantees that the clipped rows lie inside `c` and that the
/// operands have compatible shapes. Violating this is a bug in the
/// orchestration and panics on the first out-of-range access.
#[inline]
pub fn accumulate<T: Scalar>(
    row_start: usize,
    col_start: usize,
    k_start: usize,
    sz_block: usize,
    a: &Matrix<T>,
    b: &Matrix<T>,
    c: &mut RowBandMut<'_, T>,
) {
    debug_assert_eq!(a.ncols(), b.nrows(), "reduction dimensions differ");
    debug_assert_eq!(c.ncols(), b.ncols(), "output width differs from B");

    let row_end = min(a.nrows(), row_start.saturating_add(sz_block));
    let k_end = min(a.ncols(), k_start.saturating_add(sz_block));
    let col_end = min(b.ncols(), col_start.saturating_add(sz_block));

    if col_start >= col_end {
        return;
    }

    for i in row_start..row_end {
        let a_row = a.row(i);
        let c_tile_row = &mut c.row_mut(i)[col_start..col_end];

        for (k, &a_ik) in a_row.iter().enumerate().take(k_end).skip(k_start) {
            let b_tile_row = &b.row(k)[col_start..col_end];

            for (c_ij, &b_kj) in c_tile_row.iter_mut().zip(b_tile_row) {
                *c_ij = *c_ij + a_ik * b_kj;
            }
        }
    }
}
