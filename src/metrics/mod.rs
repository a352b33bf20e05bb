//! Evaluation metrics.
//!
//! Only classification accuracy is needed here; the held-out score
//! reported after fitting goes through [`accuracy`].

/// Compute classification accuracy.
///
/// accuracy = `correct_predictions` / `total_predictions`
///
/// # Arguments
///
/// * `y_pred` - Predicted class labels
/// * `y_true` - True class labels
///
/// # Returns
///
/// Accuracy score between 0.0 and 1.0
///
/// # Panics
///
/// Panics if the slices have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use reconocer::metrics::accuracy;
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 2];
/// let acc = accuracy(&y_pred, &y_true);
/// assert!((acc - 0.5).abs() < 1e-6);
/// ```
#[must_use]
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Slices must have same length");
    assert!(!y_true.is_empty(), "Slices cannot be empty");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();

    correct as f32 / y_true.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_perfect() {
        let labels = vec![0, 1, 2, 3];
        assert_eq!(accuracy(&labels, &labels), 1.0);
    }

    #[test]
    fn test_accuracy_none_correct() {
        assert_eq!(accuracy(&[1, 2, 3], &[0, 0, 0]), 0.0);
    }

    #[test]
    fn test_accuracy_partial() {
        let acc = accuracy(&[0, 1, 0, 1], &[0, 1, 1, 0]);
        assert!((acc - 0.5).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_accuracy_length_mismatch_panics() {
        let _ = accuracy(&[0, 1], &[0]);
    }
}
