//! # blockmm
//!
//! Cache-blocked, Rayon-parallel dense matrix multiplication.
//!
//! `C = A * B` is computed tile by tile: the iteration space is cut into
//! square blocks of edge [`SZ_BLOCK`] (or any size set through
//! [`MatMulConfig`]) so that the operands of each inner computation stay in
//! cache, and the row-block loop is spread across Rayon workers. Each worker
//! writes a disjoint band of rows of `C`.
//!
//! ```
//! use blockmm::{multiply, Matrix};
//!
//! let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
//! let b = Matrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
//!
//! let c = multiply(&a, &b).unwrap();
//! assert_eq!(c.as_slice(), &[19.0, 22.0, 43.0, 50.0]);
//! ```
//!
//! Tuning the block size, or running on the calling thread only:
//!
//! ```
//! use blockmm::{multiply_with, MatMulConfig, Matrix};
//!
//! let a = Matrix::<f64>::identity(100);
//! let b = Matrix::from_fn(100, 70, |i, j| (i * j) as f64);
//!
//! let config = MatMulConfig::sequential().with_block_size(32).unwrap();
//! let c = multiply_with(&a, &b, &config).unwrap();
//! assert_eq!(c, b);
//! ```

pub mod blocked;
pub mod config;
pub mod error;
pub mod kernel;
pub mod matrix;
pub mod naive;

pub use blocked::{multiply, multiply_with};
pub use config::{BlockSpec, MatMulConfig, Parallelism};
pub use error::{MatMulError, Result};
pub use matrix::{Matrix, RowBandMut, Scalar};

/// Default tile edge length, shared by the row, column and reduction loops.
pub const SZ_BLOCK: usize = 64;
