//! Core numeric primitives (Vector, Matrix).
//!
//! Row-major storage throughout; the flattening convention of
//! [`Matrix::as_slice`] is the one feature vectors follow.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
