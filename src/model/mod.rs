//! Digit classifier lifecycle: create, fit, predict, save, load.
//!
//! Each [`DigitClassifier`] instance owns its own lifecycle state and
//! algorithm handle; nothing is shared across instances. The state
//! machine is `Uninitialized -> Created -> Fitted`, with `load`
//! jumping straight to `Fitted` from any state. Fitting is one-shot:
//! a second `fit` is rejected, never overwritten.

use crate::classification::{DistanceMetric, KNearestNeighbors};
use crate::dataset::{DatasetProvider, TrainingSet};
use crate::error::{Error, Result};
use crate::primitives::{Matrix, Vector};
use crate::serialization::safetensors::{
    extract_tensor, load_safetensors, save_safetensors, UserMetadata,
};
use crate::transform;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default model-store location, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = "digits.safetensors";

/// Lifecycle state of a [`DigitClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No algorithm handle allocated yet; only `create` and `load` are
    /// valid.
    Uninitialized,
    /// Algorithm allocated with hyperparameters, not yet trained.
    Created,
    /// Trained (via `fit`) or restored (via `load`); ready to predict.
    Fitted,
}

/// Handwritten-digit classifier wrapping a k-nearest-neighbor model.
///
/// # Example
///
/// ```
/// use reconocer::model::DigitClassifier;
/// use reconocer::dataset::TrainingSet;
/// use reconocer::primitives::{Matrix, Vector};
///
/// // Two trivially separable one-feature "digits".
/// let x_train = Matrix::from_vec(2, 1, vec![0.0, 1.0]).expect("valid");
/// let x_test = x_train.clone();
/// let ts = TrainingSet::new(x_train, vec![0, 1], x_test, vec![0, 1]).expect("parallel");
///
/// let mut model = DigitClassifier::new(1, 2).expect("valid hyperparameters");
/// model.fit(&ts).expect("first fit succeeds");
///
/// let digit = model.predict(&Vector::from_slice(&[0.9])).expect("fitted");
/// assert_eq!(digit, 1);
/// ```
#[derive(Debug, Clone)]
pub struct DigitClassifier {
    state: ModelState,
    /// Neighbor count
    k: usize,
    /// Minkowski power parameter
    p: u32,
    knn: Option<KNearestNeighbors>,
    store_path: PathBuf,
}

impl DigitClassifier {
    /// Creates a classifier with the given hyperparameters, allocating
    /// an unfitted algorithm handle (state `Created`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHyperparameter`] unless `k >= 1` and
    /// `p >= 1`.
    pub fn new(k: usize, p: u32) -> Result<Self> {
        let mut model = Self::uninitialized();
        model.create(k, p)?;
        Ok(model)
    }

    /// Returns a blank instance in state `Uninitialized`.
    ///
    /// Useful as the target of [`load`](Self::load), which does not
    /// require a prior `create`.
    #[must_use]
    pub fn uninitialized() -> Self {
        Self {
            state: ModelState::Uninitialized,
            k: 0,
            p: 0,
            knn: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }

    /// Overrides the model-store location for this instance.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Returns the configured model-store location.
    #[must_use]
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Returns the neighbor count hyperparameter.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the Minkowski power hyperparameter.
    #[must_use]
    pub fn p(&self) -> u32 {
        self.p
    }

    /// (Re)initializes the algorithm handle with the given
    /// hyperparameters, moving to state `Created`.
    ///
    /// Calling this on an already-created or fitted instance simply
    /// reinitializes it; there is no guard against re-creation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHyperparameter`] unless `k >= 1` and
    /// `p >= 1`.
    pub fn create(&mut self, k: usize, p: u32) -> Result<()> {
        if k == 0 {
            return Err(Error::InvalidHyperparameter {
                param: "k".to_string(),
                value: k.to_string(),
                constraint: ">= 1".to_string(),
            });
        }
        if p == 0 {
            return Err(Error::InvalidHyperparameter {
                param: "p".to_string(),
                value: p.to_string(),
                constraint: ">= 1".to_string(),
            });
        }

        self.k = k;
        self.p = p;
        self.knn = Some(KNearestNeighbors::new(k).with_metric(DistanceMetric::from_power(p)));
        self.state = ModelState::Created;
        tracing::info!(k, p, "model created");
        Ok(())
    }

    /// Fits the classifier on the supplied training set and reports
    /// held-out accuracy.
    ///
    /// The accuracy score is logged for observability only; it is not
    /// stored. The training set is not retained beyond what the
    /// nearest-neighbor algorithm itself keeps.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotCreated`] before `create`,
    /// [`Error::AlreadyFitted`] on a second fit, and propagates any
    /// algorithm-level failure on the data itself.
    pub fn fit(&mut self, training_set: &TrainingSet) -> Result<()> {
        self.check_fit_allowed()?;

        let knn = self.knn.as_mut().ok_or(Error::NotCreated)?;
        knn.fit(&training_set.x_train, &training_set.y_train)?;
        self.state = ModelState::Fitted;
        tracing::info!("model fitted");

        let score = self
            .knn
            .as_ref()
            .ok_or(Error::NotCreated)?
            .score(&training_set.x_test, &training_set.y_test)?;
        tracing::info!(accuracy = score, "held-out score");
        Ok(())
    }

    /// Obtains a raw dataset from the provider, normalizes it, and
    /// fits.
    ///
    /// The provider's rows must already match the resolution the model
    /// expects; no resize is applied to bulk training data.
    ///
    /// # Errors
    ///
    /// Same lifecycle guards as [`fit`](Self::fit), plus any provider
    /// or normalization failure.
    pub fn fit_from_provider<P: DatasetProvider>(&mut self, provider: &P) -> Result<()> {
        self.check_fit_allowed()?;
        let raw = provider.load_labeled_dataset()?;
        let training_set = TrainingSet::from_raw(&raw)?;
        self.fit(&training_set)
    }

    /// Predicts the digit class for a precomputed feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] unless the model is fitted; feature
    /// length mismatches propagate as algorithm-level dimension errors.
    pub fn predict(&self, features: &Vector<f32>) -> Result<usize> {
        if self.state != ModelState::Fitted {
            return Err(Error::NotFitted);
        }
        let knn = self.knn.as_ref().ok_or(Error::NotFitted)?;

        let x = Matrix::from_vec(1, features.len(), features.as_slice().to_vec())
            .expect("1 x len(features) always matches the data length");
        let predictions = knn.predict(&x)?;
        Ok(predictions[0])
    }

    /// Reads an encoded image from `path`, runs it through the
    /// compression pipeline, and predicts its digit class.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the path cannot be read,
    /// [`Error::Decode`] on malformed image bytes, [`Error::Shape`] on
    /// incompatible dimensions, and [`Error::NotFitted`] before
    /// fit/load.
    pub fn predict_image_path<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let raw_bytes = std::fs::read(path)?;
        let features = transform::decode_and_compress(&raw_bytes)?;
        self.predict(&features)
    }

    /// Serializes the fitted model (hyperparameters + algorithm state)
    /// to the store location, overwriting any existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFitted`] unless fitted, and any store write
    /// failure.
    pub fn save(&self) -> Result<()> {
        if self.state != ModelState::Fitted {
            return Err(Error::NotFitted);
        }
        let knn = self.knn.as_ref().ok_or(Error::NotFitted)?;
        let (x_train, y_train) = knn.training_data().ok_or(Error::NotFitted)?;

        let (n_samples, n_features) = x_train.shape();
        let mut tensors = BTreeMap::new();
        tensors.insert(
            "x_train".to_string(),
            (x_train.as_slice().to_vec(), vec![n_samples, n_features]),
        );
        // Digit labels 0-9 are exactly representable in f32.
        tensors.insert(
            "y_train".to_string(),
            (
                y_train.iter().map(|&l| l as f32).collect(),
                vec![n_samples],
            ),
        );

        let mut user_metadata = UserMetadata::new();
        user_metadata.insert("k".to_string(), self.k.to_string());
        user_metadata.insert("p".to_string(), self.p.to_string());

        save_safetensors(&self.store_path, &tensors, &user_metadata)?;
        tracing::info!(path = %self.store_path.display(), "model saved");
        Ok(())
    }

    /// Restores a previously saved model from the store location,
    /// setting state directly to `Fitted` with the persisted
    /// hyperparameters and algorithm state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreNotFound`] if no persisted model exists at
    /// the location and [`Error::CorruptStore`] if deserialization
    /// fails.
    pub fn load(&mut self) -> Result<()> {
        if !self.store_path.exists() {
            return Err(Error::StoreNotFound {
                path: self.store_path.clone(),
            });
        }

        let (metadata, user_metadata, raw_data) = load_safetensors(&self.store_path)?;

        let k: usize = parse_hyperparameter(&user_metadata, "k")?;
        let p: u32 = parse_hyperparameter(&user_metadata, "p")?;

        let x_meta = metadata
            .get("x_train")
            .ok_or_else(|| Error::corrupt_store("missing 'x_train' tensor"))?;
        let y_meta = metadata
            .get("y_train")
            .ok_or_else(|| Error::corrupt_store("missing 'y_train' tensor"))?;

        if x_meta.shape.len() != 2 {
            return Err(Error::corrupt_store(format!(
                "'x_train' must be 2-D, got shape {:?}",
                x_meta.shape
            )));
        }
        let (n_samples, n_features) = (x_meta.shape[0], x_meta.shape[1]);
        // Shape values come straight from the file; the product must be
        // checked before any allocation or indexing math trusts it.
        let n_elements = n_samples.checked_mul(n_features).ok_or_else(|| {
            Error::corrupt_store(format!(
                "'x_train' shape {:?} overflows the element count",
                x_meta.shape
            ))
        })?;

        let x_data = extract_tensor(&raw_data, x_meta)?;
        if x_data.len() != n_elements {
            return Err(Error::corrupt_store(format!(
                "'x_train' holds {} values for shape {:?}",
                x_data.len(),
                x_meta.shape
            )));
        }
        let x_train = Matrix::from_vec(n_samples, n_features, x_data)
            .map_err(Error::corrupt_store)?;

        let y_data = extract_tensor(&raw_data, y_meta)?;
        let y_train: Vec<usize> = y_data.iter().map(|&l| l as usize).collect();

        let mut knn = KNearestNeighbors::new(k).with_metric(DistanceMetric::from_power(p));
        knn.fit(&x_train, &y_train).map_err(|e| {
            Error::corrupt_store(format!("persisted training data is inconsistent: {e}"))
        })?;

        self.k = k;
        self.p = p;
        self.knn = Some(knn);
        self.state = ModelState::Fitted;
        tracing::debug!(path = %self.store_path.display(), k, p, "model loaded");
        Ok(())
    }

    fn check_fit_allowed(&self) -> Result<()> {
        match self.state {
            ModelState::Uninitialized => Err(Error::NotCreated),
            ModelState::Fitted => Err(Error::AlreadyFitted),
            ModelState::Created => Ok(()),
        }
    }
}

impl Default for DigitClassifier {
    /// Default hyperparameters: k = 5 neighbors, Euclidean distance
    /// (p = 2).
    fn default() -> Self {
        Self::new(5, 2).expect("default hyperparameters are valid")
    }
}

fn parse_hyperparameter<T: std::str::FromStr>(
    user_metadata: &UserMetadata,
    name: &str,
) -> Result<T> {
    let raw = user_metadata
        .get(name)
        .ok_or_else(|| Error::corrupt_store(format!("missing '{name}' hyperparameter")))?;
    raw.parse()
        .map_err(|_| Error::corrupt_store(format!("invalid '{name}' hyperparameter: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawDataset;
    use tempfile::tempdir;

    fn tiny_training_set() -> TrainingSet {
        // Two far-apart clusters so k=1 predictions are deterministic.
        let x_train = Matrix::from_vec(
            4,
            2,
            vec![0.0, 0.0, 0.1, 0.0, 1.0, 1.0, 0.9, 1.0],
        )
        .expect("valid");
        let x_test = Matrix::from_vec(2, 2, vec![0.05, 0.0, 0.95, 1.0]).expect("valid");
        TrainingSet::new(x_train, vec![3, 3, 8, 8], x_test, vec![3, 8]).expect("parallel")
    }

    #[test]
    fn test_new_starts_created() {
        let model = DigitClassifier::new(5, 2).expect("valid");
        assert_eq!(model.state(), ModelState::Created);
        assert_eq!(model.k(), 5);
        assert_eq!(model.p(), 2);
    }

    #[test]
    fn test_new_rejects_zero_k() {
        let err = DigitClassifier::new(0, 2).expect_err("k = 0");
        assert!(matches!(err, Error::InvalidHyperparameter { .. }));
    }

    #[test]
    fn test_new_rejects_zero_p() {
        let err = DigitClassifier::new(5, 0).expect_err("p = 0");
        assert!(matches!(err, Error::InvalidHyperparameter { .. }));
    }

    #[test]
    fn test_uninitialized_cannot_fit() {
        let mut model = DigitClassifier::uninitialized();
        assert_eq!(model.state(), ModelState::Uninitialized);
        let err = model.fit(&tiny_training_set()).expect_err("no create");
        assert!(matches!(err, Error::NotCreated));
    }

    #[test]
    fn test_fit_transitions_to_fitted() {
        let mut model = DigitClassifier::new(1, 2).expect("valid");
        model.fit(&tiny_training_set()).expect("first fit");
        assert_eq!(model.state(), ModelState::Fitted);
    }

    #[test]
    fn test_fit_twice_rejected() {
        let mut model = DigitClassifier::new(1, 2).expect("valid");
        let ts = tiny_training_set();
        model.fit(&ts).expect("first fit");
        let err = model.fit(&ts).expect_err("second fit");
        assert!(matches!(err, Error::AlreadyFitted));
    }

    #[test]
    fn test_recreate_resets_lifecycle() {
        let mut model = DigitClassifier::new(1, 2).expect("valid");
        let ts = tiny_training_set();
        model.fit(&ts).expect("fit");

        // create() has no re-creation guard: it reinitializes.
        model.create(3, 1).expect("recreate");
        assert_eq!(model.state(), ModelState::Created);
        assert_eq!(model.k(), 3);
        model.fit(&ts).expect("fit after recreate");
    }

    #[test]
    fn test_predict_before_fit_rejected() {
        let model = DigitClassifier::new(1, 2).expect("valid");
        let err = model
            .predict(&Vector::from_slice(&[0.0, 0.0]))
            .expect_err("not fitted");
        assert!(matches!(err, Error::NotFitted));
    }

    #[test]
    fn test_predict_nearest_cluster() {
        let mut model = DigitClassifier::new(1, 2).expect("valid");
        model.fit(&tiny_training_set()).expect("fit");

        assert_eq!(
            model.predict(&Vector::from_slice(&[0.02, 0.0])).expect("fitted"),
            3
        );
        assert_eq!(
            model.predict(&Vector::from_slice(&[0.98, 1.0])).expect("fitted"),
            8
        );
    }

    #[test]
    fn test_fit_from_provider_normalizes() {
        struct TwoTone;
        impl DatasetProvider for TwoTone {
            fn load_labeled_dataset(&self) -> Result<RawDataset> {
                Ok(RawDataset {
                    train_images: vec![Matrix::filled(2, 2, 0), Matrix::filled(2, 2, 255)],
                    train_labels: vec![0, 1],
                    test_images: vec![Matrix::filled(2, 2, 255)],
                    test_labels: vec![1],
                })
            }
        }

        let mut model = DigitClassifier::new(1, 2).expect("valid");
        model.fit_from_provider(&TwoTone).expect("fit");

        // Bulk normalization keeps raw polarity: white rows sit at 1.0.
        let white = Vector::from_slice(&[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(model.predict(&white).expect("fitted"), 1);
    }

    #[test]
    fn test_fit_from_provider_respects_guards() {
        struct Panicking;
        impl DatasetProvider for Panicking {
            fn load_labeled_dataset(&self) -> Result<RawDataset> {
                panic!("provider must not be consulted when fit is invalid");
            }
        }

        let mut model = DigitClassifier::new(1, 2).expect("valid");
        model.fit(&tiny_training_set()).expect("fit");
        let err = model.fit_from_provider(&Panicking).expect_err("fitted");
        assert!(matches!(err, Error::AlreadyFitted));
    }

    #[test]
    fn test_save_before_fit_rejected() {
        let model = DigitClassifier::new(1, 2).expect("valid");
        assert!(matches!(model.save(), Err(Error::NotFitted)));
    }

    #[test]
    fn test_save_load_roundtrip_predictions_match() {
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("digits.safetensors");

        let mut model = DigitClassifier::new(1, 2)
            .expect("valid")
            .with_store_path(&store);
        model.fit(&tiny_training_set()).expect("fit");
        model.save().expect("save");

        let mut restored = DigitClassifier::uninitialized().with_store_path(&store);
        restored.load().expect("load");

        assert_eq!(restored.state(), ModelState::Fitted);
        assert_eq!(restored.k(), 1);
        assert_eq!(restored.p(), 2);

        for probe in [[0.03_f32, 0.0], [0.97, 1.0], [0.5, 0.4]] {
            let v = Vector::from_slice(&probe);
            assert_eq!(
                model.predict(&v).expect("original"),
                restored.predict(&v).expect("restored"),
            );
        }
    }

    #[test]
    fn test_load_missing_store() {
        let dir = tempdir().expect("tempdir");
        let mut model = DigitClassifier::uninitialized()
            .with_store_path(dir.path().join("absent.safetensors"));
        let err = model.load().expect_err("missing store");
        assert!(matches!(err, Error::StoreNotFound { .. }));
        assert_eq!(model.state(), ModelState::Uninitialized);
    }

    #[test]
    fn test_load_corrupt_store() {
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("corrupt.safetensors");
        std::fs::write(&store, b"garbage").expect("write");

        let mut model = DigitClassifier::uninitialized().with_store_path(&store);
        let err = model.load().expect_err("corrupt store");
        assert!(matches!(err, Error::CorruptStore { .. }));
    }

    #[test]
    fn test_load_rejects_overflowing_tensor_shape() {
        // Valid JSON, hostile shape: the declared element count
        // overflows usize. Must surface as CorruptStore, not panic.
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("hostile_shape.safetensors");

        let mut tensors = BTreeMap::new();
        tensors.insert(
            "x_train".to_string(),
            (vec![0.0_f32, 0.0, 1.0, 1.0], vec![usize::MAX, usize::MAX]),
        );
        tensors.insert("y_train".to_string(), (vec![0.0_f32, 1.0], vec![2]));
        let mut user_metadata = UserMetadata::new();
        user_metadata.insert("k".to_string(), "1".to_string());
        user_metadata.insert("p".to_string(), "2".to_string());
        save_safetensors(&store, &tensors, &user_metadata).expect("write store");

        let mut model = DigitClassifier::uninitialized().with_store_path(&store);
        let err = model.load().expect_err("overflowing shape");
        assert!(matches!(err, Error::CorruptStore { .. }));
    }

    #[test]
    fn test_load_rejects_shape_element_count_mismatch() {
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("short_tensor.safetensors");

        let mut tensors = BTreeMap::new();
        // Declares 3x2 but carries only 4 values.
        tensors.insert(
            "x_train".to_string(),
            (vec![0.0_f32, 0.0, 1.0, 1.0], vec![3, 2]),
        );
        tensors.insert("y_train".to_string(), (vec![0.0_f32, 1.0], vec![2]));
        let mut user_metadata = UserMetadata::new();
        user_metadata.insert("k".to_string(), "1".to_string());
        user_metadata.insert("p".to_string(), "2".to_string());
        save_safetensors(&store, &tensors, &user_metadata).expect("write store");

        let mut model = DigitClassifier::uninitialized().with_store_path(&store);
        let err = model.load().expect_err("element count mismatch");
        assert!(matches!(err, Error::CorruptStore { .. }));
    }

    #[test]
    fn test_load_rejects_out_of_range_p() {
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("huge_p.safetensors");

        let mut tensors = BTreeMap::new();
        tensors.insert(
            "x_train".to_string(),
            (vec![0.0_f32, 0.0, 1.0, 1.0], vec![2, 2]),
        );
        tensors.insert("y_train".to_string(), (vec![0.0_f32, 1.0], vec![2]));
        let mut user_metadata = UserMetadata::new();
        user_metadata.insert("k".to_string(), "1".to_string());
        // One past u32::MAX: must be rejected, never truncated.
        user_metadata.insert("p".to_string(), "4294967296".to_string());
        save_safetensors(&store, &tensors, &user_metadata).expect("write store");

        let mut model = DigitClassifier::uninitialized().with_store_path(&store);
        let err = model.load().expect_err("p out of range");
        assert!(matches!(err, Error::CorruptStore { .. }));
    }

    #[test]
    fn test_save_overwrites_existing_store() {
        let dir = tempdir().expect("tempdir");
        let store = dir.path().join("digits.safetensors");
        std::fs::write(&store, b"stale").expect("write");

        let mut model = DigitClassifier::new(1, 2)
            .expect("valid")
            .with_store_path(&store);
        model.fit(&tiny_training_set()).expect("fit");
        model.save().expect("save overwrites");

        let mut restored = DigitClassifier::uninitialized().with_store_path(&store);
        restored.load().expect("load");
    }

    #[test]
    fn test_predict_image_path_unreadable() {
        let model = DigitClassifier::new(1, 2).expect("valid");
        let err = model
            .predict_image_path("/nonexistent/digit.png")
            .expect_err("unreadable");
        assert!(matches!(err, Error::Io(_)));
    }
}
