//! Error types for reconocer operations.
//!
//! Every precondition violation is surfaced as a typed error to the
//! immediate caller; there is no local recovery or retry anywhere in
//! the crate.

use std::fmt;
use std::path::PathBuf;

/// Main error type for reconocer operations.
///
/// Covers the classifier lifecycle guards, the image pipeline, and the
/// model store.
///
/// # Examples
///
/// ```
/// use reconocer::error::Error;
///
/// let err = Error::Shape {
///     expected: "square side divisible by 28".to_string(),
///     actual: "300x280".to_string(),
/// };
/// assert!(err.to_string().contains("shape"));
/// ```
#[derive(Debug)]
pub enum Error {
    /// Operation requires a created model (`create` was never called).
    NotCreated,

    /// `fit` called on a model that is already fitted.
    AlreadyFitted,

    /// `predict` or `save` called before `fit`/`load`.
    NotFitted,

    /// Image dimensions are incompatible with the fixed downsampling grid.
    Shape {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Raw bytes could not be decoded as an image.
    Decode(image::ImageError),

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// No persisted model exists at the store location.
    StoreNotFound {
        /// Store path that was probed
        path: PathBuf,
    },

    /// The persisted model exists but could not be deserialized.
    CorruptStore {
        /// Error description
        message: String,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Training data dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotCreated => write!(f, "Model not created: call create() first"),
            Error::AlreadyFitted => write!(f, "Model already fitted: fit() is one-shot"),
            Error::NotFitted => write!(f, "Model not fitted: call fit() or load() first"),
            Error::Shape { expected, actual } => {
                write!(
                    f,
                    "Incompatible image shape: expected {expected}, got {actual}"
                )
            }
            Error::Decode(e) => write!(f, "Image decode failed: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::StoreNotFound { path } => {
                write!(f, "No persisted model at {}", path.display())
            }
            Error::CorruptStore { message } => {
                write!(f, "Corrupt model store: {message}")
            }
            Error::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            Error::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err)
    }
}

impl Error {
    /// Create a shape error from an actual (rows, cols) pair.
    #[must_use]
    pub fn bad_shape(expected: &str, rows: usize, cols: usize) -> Self {
        Self::Shape {
            expected: expected.to_string(),
            actual: format!("{rows}x{cols}"),
        }
    }

    /// Create a corrupt-store error with a descriptive message.
    #[must_use]
    pub fn corrupt_store(message: impl Into<String>) -> Self {
        Self::CorruptStore {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_errors_display() {
        assert!(Error::NotCreated.to_string().contains("not created"));
        assert!(Error::AlreadyFitted.to_string().contains("already fitted"));
        assert!(Error::NotFitted.to_string().contains("not fitted"));
    }

    #[test]
    fn test_shape_error_display() {
        let err = Error::bad_shape("square side divisible by 28", 300, 280);
        let msg = err.to_string();
        assert!(msg.contains("shape"));
        assert!(msg.contains("300x280"));
        assert!(msg.contains("divisible by 28"));
    }

    #[test]
    fn test_store_not_found_display() {
        let err = Error::StoreNotFound {
            path: PathBuf::from("digits.safetensors"),
        };
        assert!(err.to_string().contains("digits.safetensors"));
    }

    #[test]
    fn test_corrupt_store_display() {
        let err = Error::corrupt_store("truncated header");
        assert!(err.to_string().contains("Corrupt model store"));
        assert!(err.to_string().contains("truncated header"));
    }

    #[test]
    fn test_invalid_hyperparameter_display() {
        let err = Error::InvalidHyperparameter {
            param: "k".to_string(),
            value: "0".to_string(),
            constraint: ">= 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains('k'));
        assert!(msg.contains(">= 1"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error as _;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_lifecycle() {
        use std::error::Error as _;
        assert!(Error::NotFitted.source().is_none());
    }
}
