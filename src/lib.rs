//! Reconocer: handwritten-digit recognition with k-nearest neighbors.
//!
//! The crate covers the full model lifecycle (create, fit, predict,
//! save, load) plus the deterministic image pipeline that turns an
//! arbitrary-resolution grayscale scan into the fixed 784-length
//! feature vector the classifier expects.
//!
//! # Quick Start
//!
//! ```
//! use reconocer::prelude::*;
//!
//! // Two trivially separable one-feature "digits".
//! let x_train = Matrix::from_vec(2, 1, vec![0.0, 1.0]).unwrap();
//! let x_test = x_train.clone();
//! let ts = TrainingSet::new(x_train, vec![0, 1], x_test, vec![0, 1]).unwrap();
//!
//! let mut model = DigitClassifier::new(1, 2).unwrap();
//! model.fit(&ts).unwrap();
//!
//! let digit = model.predict(&Vector::from_slice(&[0.1])).unwrap();
//! assert_eq!(digit, 0);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`transform`]: Image-to-feature-vector pipeline (min-pool
//!   downsampling + normalization)
//! - [`classification`]: K-Nearest Neighbors algorithm
//! - [`metrics`]: Evaluation metrics (accuracy)
//! - [`dataset`]: Training data types and the dataset-provider interface
//! - [`model`]: Classifier lifecycle state machine and persistence
//! - [`serialization`]: SafeTensors-format model store
//! - [`error`]: Crate-wide error taxonomy

pub mod classification;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod model;
pub mod prelude;
pub mod primitives;
pub mod serialization;
pub mod transform;

pub use error::{Error, Result};
