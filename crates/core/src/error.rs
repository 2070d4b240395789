//! Core Error Types
//!
//! Defines the error types shared across the Plant Doctor workspace. These
//! types only depend on thiserror + std so the core crate stays lightweight.
//!
//! The application crate wraps them in its own error enums (diagnosis,
//! session).

use thiserror::Error;

/// Reasons an uploaded file is rejected before any work is done on it.
///
/// The display strings are shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// MIME type outside the allow-list
    #[error("Please select a JPEG, PNG, or WebP image file (got {mime_type})")]
    UnsupportedFormat { mime_type: String },

    /// Payload larger than the upload limit
    #[error("File size must be less than 5MB ({size} bytes exceeds the {limit} byte limit)")]
    FileTooLarge { size: u64, limit: u64 },
}

/// Failures while turning an image into transport text.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The backing file could not be read
    #[error("Failed to read image '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Fewer or more bytes were read than the file declared
    #[error("Image '{name}' changed while reading: expected {expected} bytes, read {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// A string that should have been a `data:<mime>;base64,` URI
    #[error("Malformed transport text: {0}")]
    MalformedTransportText(String),
}

/// Configuration errors raised while building core settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value could not be parsed into configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parsed configuration that breaks a constraint
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
