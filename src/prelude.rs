//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use reconocer::prelude::*;
//! ```

pub use crate::classification::{DistanceMetric, KNearestNeighbors};
pub use crate::dataset::{DatasetProvider, RawDataset, TrainingSet};
pub use crate::error::{Error, Result};
pub use crate::metrics::accuracy;
pub use crate::model::{DigitClassifier, ModelState};
pub use crate::primitives::{Matrix, Vector};
pub use crate::transform::{compress, decode_and_compress, FEATURE_LEN, GRID_SIZE};
