//! Image-to-feature-vector pipeline.
//!
//! Converts an arbitrary-resolution grayscale image into the fixed
//! 784-length normalized vector the classifier expects. Downsampling
//! keeps the *minimum* intensity per bin so a single dark pixel darkens
//! its whole cell, which preserves thin pen strokes that plain
//! averaging would wash out.
//!
//! Normalization on this path is brightness-inverted:
//! `(255 - v) / 255`, so bright background maps to 0.0 and dark ink to
//! 1.0. Bulk training rows built by [`crate::dataset::TrainingSet`] are
//! scaled by `/255` *without* this inversion; both behaviors are
//! observable contracts of the crate.

use crate::error::{Error, Result};
use crate::primitives::{Matrix, Vector};
use image::GrayImage;

/// Side length of the downsampled grid.
pub const GRID_SIZE: usize = 28;

/// Length of a flattened feature vector (`GRID_SIZE` squared).
pub const FEATURE_LEN: usize = GRID_SIZE * GRID_SIZE;

/// Compresses a square intensity matrix into a normalized 784-length
/// feature vector.
///
/// The input is partitioned into a 28x28 grid of non-overlapping square
/// bins (bin side = input side / 28). Each output cell takes the
/// minimum intensity within its bin, then is mapped through
/// `(255 - v) / 255`. The output is flattened row-major.
///
/// # Errors
///
/// Returns [`Error::Shape`] if the input is not square or its side is
/// not a positive multiple of 28. The input is never truncated or
/// padded to fit.
///
/// # Examples
///
/// ```
/// use reconocer::primitives::Matrix;
/// use reconocer::transform::{compress, FEATURE_LEN};
///
/// // Pure white 280x280 canvas: every cell normalizes to 0.0.
/// let white = Matrix::filled(280, 280, 255);
/// let features = compress(&white).expect("280 is divisible by 28");
/// assert_eq!(features.len(), FEATURE_LEN);
/// assert!(features.as_slice().iter().all(|&v| v == 0.0));
/// ```
pub fn compress(image: &Matrix<u8>) -> Result<Vector<f32>> {
    let (rows, cols) = image.shape();
    if rows != cols {
        return Err(Error::bad_shape("square image", rows, cols));
    }
    if rows == 0 || rows % GRID_SIZE != 0 {
        return Err(Error::bad_shape(
            "square side a positive multiple of 28",
            rows,
            cols,
        ));
    }

    let bin = rows / GRID_SIZE;
    let mut features = Vec::with_capacity(FEATURE_LEN);

    for grid_row in 0..GRID_SIZE {
        for grid_col in 0..GRID_SIZE {
            let mut darkest = u8::MAX;
            for r in 0..bin {
                for c in 0..bin {
                    let v = image.get(grid_row * bin + r, grid_col * bin + c);
                    if v < darkest {
                        darkest = v;
                    }
                }
            }
            features.push(f32::from(255 - darkest) / 255.0);
        }
    }

    Ok(Vector::from_vec(features))
}

/// Decodes raw encoded image bytes (PNG, JPEG, ...) to a luminance
/// matrix and delegates to [`compress`].
///
/// # Errors
///
/// Returns [`Error::Decode`] on malformed or unsupported image data,
/// or any error [`compress`] reports on the decoded dimensions.
pub fn decode_and_compress(raw_bytes: &[u8]) -> Result<Vector<f32>> {
    let decoded = image::load_from_memory(raw_bytes)?;
    let gray = decoded.to_luma8();
    compress(&gray_to_matrix(&gray))
}

/// Converts a decoded grayscale image into an intensity matrix.
///
/// `GrayImage` buffers are already row-major, one byte per pixel, so
/// this is a straight reshape.
#[must_use]
pub fn gray_to_matrix(image: &GrayImage) -> Matrix<u8> {
    let (width, height) = image.dimensions();
    Matrix::from_vec(height as usize, width as usize, image.as_raw().clone())
        .expect("GrayImage buffer length always equals width * height")
}
