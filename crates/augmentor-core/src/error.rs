//! Error types for the labeled image augmentor.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for augmentation operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Image has zero or inconsistent dimensions
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Caller-supplied data violates a precondition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Decoding an input image failed
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// Encoding or writing an output image failed
    #[error("Failed to write image '{0}': {1}")]
    ImageWrite(PathBuf, String),

    /// Output directory could not be created
    #[error("Failed to create directory '{0}': {1}")]
    CreateDir(PathBuf, #[source] std::io::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the failures that come from touching the filesystem.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            Error::ImageWrite(..) | Error::CreateDir(..) | Error::Io(_)
        )
    }
}

/// Specialized Result type for augmentation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidImage("image has zero width".to_string());
        assert_eq!(err.to_string(), "Invalid image: image has zero width");

        let err = Error::ImageWrite(PathBuf::from("out/cat/a.jpg"), "disk full".to_string());
        assert_eq!(err.to_string(), "Failed to write image 'out/cat/a.jpg': disk full");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_io_failure());
    }

    #[test]
    fn test_io_failure_classification() {
        let create = Error::CreateDir(
            PathBuf::from("/readonly/cat"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(create.is_io_failure());
        assert!(!Error::InvalidInput("x".to_string()).is_io_failure());
        assert!(!Error::InvalidImage("x".to_string()).is_io_failure());
    }
}
