//! Upload Validation
//!
//! Format and size policy for user-selected images. Pure: no I/O, metadata
//! only.

use crate::error::ValidationError;
use crate::image::ImageFile;

/// Upload limit: 5 MiB. A file of exactly this size is accepted.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// MIME types the remote model accepts
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Check a file against the upload policy. Format is checked before size.
pub fn validate(file: &ImageFile) -> Result<(), ValidationError> {
    if !is_allowed_mime_type(file.mime_type()) {
        tracing::debug!(
            "[Validator] Rejected '{}': unsupported type {}",
            file.name(),
            file.mime_type()
        );
        return Err(ValidationError::UnsupportedFormat {
            mime_type: file.mime_type().to_string(),
        });
    }

    if file.size() > MAX_FILE_SIZE {
        tracing::debug!(
            "[Validator] Rejected '{}': {} bytes over limit",
            file.name(),
            file.size()
        );
        return Err(ValidationError::FileTooLarge {
            size: file.size(),
            limit: MAX_FILE_SIZE,
        });
    }

    Ok(())
}

/// Whether the MIME type is on the allow-list (exact, lowercase match).
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}
