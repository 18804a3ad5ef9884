// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for target construction.

use std::fmt;

/// Result type alias for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;

/// Main error type for the target library.
#[derive(Debug)]
pub enum TargetError {
    /// Keypoint sequence or tensor with an incompatible shape.
    ShapeError(String),
    /// Database could not resolve an id or rasterize a mask.
    LookupError(String),
    /// Persisted id list could not be read or written.
    CacheError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Error rendering target previews.
    ImageError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
    /// Wrapped `serde_json::Error`
    Json(serde_json::Error),
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeError(msg) => write!(f, "Shape error: {msg}"),
            Self::LookupError(msg) => write!(f, "Lookup error: {msg}"),
            Self::CacheError(msg) => write!(f, "Cache error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl std::error::Error for TargetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TargetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for TargetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<ndarray::ShapeError> for TargetError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::ShapeError(err.to_string())
    }
}

#[cfg(feature = "annotate")]
impl From<image::ImageError> for TargetError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TargetError::ShapeError("test".to_string());
        assert_eq!(err.to_string(), "Shape error: test");

        let err = TargetError::CacheError("test".to_string());
        assert_eq!(err.to_string(), "Cache error: test");
    }

    #[test]
    fn test_io_source_is_kept() {
        use std::error::Error;

        let err = TargetError::from(std::io::Error::other("disk gone"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "IO error: disk gone");
    }
}
