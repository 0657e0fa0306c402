//! Error types for blockmm operations.
//!
//! Shape problems are reported to the caller instead of panicking. Index
//! errors inside the kernels are not part of this taxonomy: the blocking
//! loops never produce them, so they stay panics.

use thiserror::Error;

/// Errors that can occur while configuring or running a multiplication.
#[derive(Debug, Error)]
pub enum MatMulError {
    /// The reduction dimensions of the operands differ (`A.ncols != B.nrows`).
    #[error(
        "dimension mismatch: cannot multiply {lhs_rows}x{lhs_cols} by {rhs_rows}x{rhs_cols} \
         (inner dimensions {lhs_cols} and {rhs_rows} differ)"
    )]
    DimensionMismatch {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    /// A block edge length of zero was requested.
    #[error("invalid block size {0}: block edge length must be at least 1")]
    InvalidBlockSize(usize),

    /// A flat buffer does not hold exactly `rows * cols` elements.
    #[error("shape mismatch: {rows}x{cols} matrix needs {} elements, got {len}", .rows * .cols)]
    ShapeMismatch { rows: usize, cols: usize, len: usize },

    /// A configuration environment variable could not be parsed.
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },

    /// A dedicated worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type alias for blockmm operations.
pub type Result<T> = std::result::Result<T, MatMulError>;

/// Creates a dimension mismatch error from the two operand shapes.
pub fn dimension_mismatch(lhs: (usize, usize), rhs: (usize, usize)) -> MatMulError {
    MatMulError::DimensionMismatch {
        lhs_rows: lhs.0,
        lhs_cols: lhs.1,
        rhs_rows: rhs.0,
        rhs_cols: rhs.1,
    }
}
