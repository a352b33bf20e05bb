//! Training data types and the external dataset-provider interface.
//!
//! Dataset acquisition itself lives outside this crate; providers hand
//! over raw `[0, 255]` intensity matrices with digit labels, and
//! [`TrainingSet::from_raw`] normalizes them into classifier-ready
//! rows. Bulk rows are scaled by `/255` and flattened row-major with
//! *no* brightness inversion, unlike the single-image path in
//! [`crate::transform`].

use crate::error::{Error, Result};
use crate::primitives::Matrix;

/// Raw labeled digit data as supplied by an external provider.
///
/// Images are 2-D intensity matrices with values in `[0, 255]`; labels
/// are digit classes 0-9.
#[derive(Debug, Clone)]
pub struct RawDataset {
    /// Training images
    pub train_images: Vec<Matrix<u8>>,
    /// Training labels, parallel to `train_images`
    pub train_labels: Vec<usize>,
    /// Held-out test images
    pub test_images: Vec<Matrix<u8>>,
    /// Held-out test labels, parallel to `test_images`
    pub test_labels: Vec<usize>,
}

/// External collaborator capability: supplies a labeled train/test
/// split of raw digit images.
pub trait DatasetProvider {
    /// Loads the raw labeled dataset.
    ///
    /// # Errors
    ///
    /// Provider-specific; any failure aborts the fit that requested it.
    fn load_labeled_dataset(&self) -> Result<RawDataset>;
}

/// Normalized train/test split ready for fitting.
///
/// Rows are flattened feature vectors in `[0.0, 1.0]`; the classifier
/// never retains this after `fit` completes.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    /// Training feature rows
    pub x_train: Matrix<f32>,
    /// Training labels
    pub y_train: Vec<usize>,
    /// Held-out test feature rows
    pub x_test: Matrix<f32>,
    /// Held-out test labels
    pub y_test: Vec<usize>,
}

impl TrainingSet {
    /// Builds a training set from already-normalized feature rows.
    ///
    /// # Errors
    ///
    /// Returns a dimension error if either labels sequence does not run
    /// parallel to its feature matrix.
    pub fn new(
        x_train: Matrix<f32>,
        y_train: Vec<usize>,
        x_test: Matrix<f32>,
        y_test: Vec<usize>,
    ) -> Result<Self> {
        if x_train.n_rows() != y_train.len() {
            return Err(Error::DimensionMismatch {
                expected: format!("{} training labels", x_train.n_rows()),
                actual: format!("{}", y_train.len()),
            });
        }
        if x_test.n_rows() != y_test.len() {
            return Err(Error::DimensionMismatch {
                expected: format!("{} test labels", x_test.n_rows()),
                actual: format!("{}", y_test.len()),
            });
        }
        Ok(Self {
            x_train,
            y_train,
            x_test,
            y_test,
        })
    }

    /// Normalizes a raw dataset: each image is flattened row-major and
    /// divided by 255.
    ///
    /// No resize is applied; every image must already share one shape.
    ///
    /// # Errors
    ///
    /// Returns a dimension error on empty splits, ragged image shapes,
    /// or labels not parallel to their images.
    pub fn from_raw(raw: &RawDataset) -> Result<Self> {
        let x_train = normalize_split(&raw.train_images)?;
        let x_test = normalize_split(&raw.test_images)?;
        Self::new(
            x_train,
            raw.train_labels.clone(),
            x_test,
            raw.test_labels.clone(),
        )
    }
}

/// Flattens raw images into `/255`-scaled feature rows.
fn normalize_split(images: &[Matrix<u8>]) -> Result<Matrix<f32>> {
    let rows: Vec<Vec<f32>> = images
        .iter()
        .map(|img| {
            img.as_slice()
                .iter()
                .map(|&v| f32::from(v) / 255.0)
                .collect()
        })
        .collect();

    Matrix::from_rows(&rows).map_err(|msg| Error::DimensionMismatch {
        expected: "non-empty, uniformly shaped images".to_string(),
        actual: msg.to_string(),
    })
}
