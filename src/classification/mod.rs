//! K-Nearest Neighbors classification.
//!
//! kNN is a lazy learner: fitting stores the training data, and all
//! distance computation is deferred to prediction time. That makes the
//! stored training matrix the entirety of the fitted algorithm state,
//! which is what the model store persists.

use crate::error::{Error, Result};
use crate::metrics::accuracy;
use crate::primitives::Matrix;

/// Distance metric for K-Nearest Neighbors.
///
/// All three are members of the Minkowski family; the integer power
/// hyperparameter `p` maps onto them via [`DistanceMetric::from_power`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceMetric {
    /// Euclidean distance: `sqrt(sum((x_i - y_i)^2))` (p = 2)
    Euclidean,
    /// Manhattan distance: `sum(|x_i - y_i|)` (p = 1)
    Manhattan,
    /// Minkowski distance with arbitrary power p
    Minkowski(f32),
}

impl DistanceMetric {
    /// Maps an integer Minkowski power onto the metric enum.
    ///
    /// `1` and `2` get the cheaper specialized forms; any other power
    /// goes through the generic Minkowski computation.
    #[must_use]
    pub fn from_power(p: u32) -> Self {
        match p {
            1 => Self::Manhattan,
            2 => Self::Euclidean,
            other => Self::Minkowski(other as f32),
        }
    }
}

/// K-Nearest Neighbors classifier.
///
/// Classifies a sample by majority vote among the k closest training
/// examples under the configured distance metric.
///
/// # Example
///
/// ```
/// use reconocer::classification::KNearestNeighbors;
/// use reconocer::primitives::Matrix;
///
/// let x = Matrix::from_vec(6, 2, vec![
///     0.0, 0.0,  // class 0
///     0.0, 1.0,  // class 0
///     1.0, 0.0,  // class 0
///     5.0, 5.0,  // class 1
///     5.0, 6.0,  // class 1
///     6.0, 5.0,  // class 1
/// ]).expect("6x2 matrix with 12 values");
/// let y = vec![0, 0, 0, 1, 1, 1];
///
/// let mut knn = KNearestNeighbors::new(3);
/// knn.fit(&x, &y).expect("valid training data");
///
/// let test = Matrix::from_vec(1, 2, vec![0.5, 0.5]).expect("1x2 test matrix");
/// let predictions = knn.predict(&test).expect("predict succeeds");
/// assert_eq!(predictions[0], 0);
/// ```
#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    /// Number of neighbors to use
    k: usize,
    /// Distance metric
    metric: DistanceMetric,
    /// Training feature matrix (stored during fit)
    x_train: Option<Matrix<f32>>,
    /// Training labels (stored during fit)
    y_train: Option<Vec<usize>>,
}

impl KNearestNeighbors {
    /// Creates a new K-Nearest Neighbors classifier with Euclidean
    /// distance.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            metric: DistanceMetric::Euclidean,
            x_train: None,
            y_train: None,
        }
    }

    /// Sets the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Returns the configured neighbor count.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns true once training data has been stored.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.x_train.is_some()
    }

    /// Returns the stored training data, if fitted.
    #[must_use]
    pub fn training_data(&self) -> Option<(&Matrix<f32>, &[usize])> {
        match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => Some((x, y.as_slice())),
            _ => None,
        }
    }

    /// Fits the model by storing the training data.
    ///
    /// # Errors
    ///
    /// Returns an error on empty data, mismatched feature/label counts,
    /// or `k` larger than the number of training samples.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        let (n_samples, _n_features) = x.shape();

        if n_samples == 0 {
            return Err(Error::DimensionMismatch {
                expected: "at least 1 training sample".to_string(),
                actual: "0".to_string(),
            });
        }
        if y.len() != n_samples {
            return Err(Error::DimensionMismatch {
                expected: format!("{n_samples} labels"),
                actual: format!("{}", y.len()),
            });
        }
        if self.k > n_samples {
            return Err(Error::InvalidHyperparameter {
                param: "k".to_string(),
                value: self.k.to_string(),
                constraint: format!("<= {n_samples} training samples"),
            });
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.to_vec());

        Ok(())
    }

    /// Predicts class labels for samples.
    ///
    /// For each test sample, finds the k nearest training samples and
    /// returns the majority class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] before `fit`, or a dimension error
    /// when the feature width differs from the training data.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let x_train = self.x_train.as_ref().ok_or(Error::NotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(Error::NotFitted)?;

        let (n_samples, n_features) = x.shape();
        let (_n_train, n_train_features) = x_train.shape();

        if n_features != n_train_features {
            return Err(Error::DimensionMismatch {
                expected: format!("{n_train_features} features"),
                actual: format!("{n_features}"),
            });
        }

        let mut predictions = Vec::with_capacity(n_samples);

        for i in 0..n_samples {
            let mut distances: Vec<(f32, usize)> = Vec::with_capacity(y_train.len());

            for (j, &label) in y_train.iter().enumerate() {
                let dist = self.compute_distance(x, i, x_train, j, n_features);
                distances.push((dist, label));
            }

            distances.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .expect("distance values are valid f32 (not NaN)")
            });
            let k_nearest = &distances[..self.k];

            predictions.push(Self::majority_vote(k_nearest));
        }

        Ok(predictions)
    }

    /// Computes accuracy on held-out data.
    ///
    /// # Errors
    ///
    /// Propagates any [`predict`](Self::predict) failure.
    pub fn score(&self, x: &Matrix<f32>, y: &[usize]) -> Result<f32> {
        let predictions = self.predict(x)?;
        Ok(accuracy(&predictions, y))
    }

    /// Computes distance between a test sample and a training sample.
    fn compute_distance(
        &self,
        x1: &Matrix<f32>,
        i1: usize,
        x2: &Matrix<f32>,
        i2: usize,
        n_features: usize,
    ) -> f32 {
        match self.metric {
            DistanceMetric::Euclidean => {
                let mut sum = 0.0;
                for k in 0..n_features {
                    let diff = x1.get(i1, k) - x2.get(i2, k);
                    sum += diff * diff;
                }
                sum.sqrt()
            }
            DistanceMetric::Manhattan => {
                let mut sum = 0.0;
                for k in 0..n_features {
                    sum += (x1.get(i1, k) - x2.get(i2, k)).abs();
                }
                sum
            }
            DistanceMetric::Minkowski(p) => {
                let mut sum = 0.0;
                for k in 0..n_features {
                    sum += (x1.get(i1, k) - x2.get(i2, k)).abs().powf(p);
                }
                sum.powf(1.0 / p)
            }
        }
    }

    /// Performs majority voting among k nearest neighbors.
    fn majority_vote(neighbors: &[(f32, usize)]) -> usize {
        let mut class_counts = std::collections::HashMap::new();

        for (_dist, label) in neighbors {
            *class_counts.entry(*label).or_insert(0) += 1;
        }

        *class_counts
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(label, _)| label)
            .expect("neighbors slice is non-empty (k >= 1)")
    }
}
