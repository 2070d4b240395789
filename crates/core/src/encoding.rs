//! Transport Encoding
//!
//! Turns an [`ImageFile`] into transport text (a `data:` URI carrying standard
//! base64) and back into its parts. Also defines the preview handles the
//! presentation layer uses to show an image without re-encoding it.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use bytes::Bytes;

use crate::error::ReadError;
use crate::image::{ImageFile, ImageSource};

const DATA_URI_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Read the file's bytes and wrap them in a `data:<mime>;base64,` URI.
///
/// For disk-backed files this is where the bytes are actually read, so it is
/// the one place a revoked or vanished file surfaces as [`ReadError`].
pub async fn encode_to_transport_text(file: &ImageFile) -> Result<String, ReadError> {
    let bytes = read_bytes(file).await?;
    let payload = base64::engine::general_purpose::STANDARD.encode(&bytes);
    tracing::debug!(
        "[Encoder] Encoded '{}' ({} bytes -> {} chars)",
        file.name(),
        bytes.len(),
        payload.len()
    );
    Ok(format!(
        "{}{}{}{}",
        DATA_URI_SCHEME,
        file.mime_type(),
        BASE64_MARKER,
        payload
    ))
}

async fn read_bytes(file: &ImageFile) -> Result<Bytes, ReadError> {
    match file.source() {
        ImageSource::Memory(bytes) => Ok(bytes.clone()),
        ImageSource::Path(path) => {
            let data = tokio::fs::read(path).await.map_err(|e| ReadError::Io {
                name: file.name().to_string(),
                source: e,
            })?;
            // The validator only saw the size from metadata; refuse to ship
            // something different from what was validated.
            if data.len() as u64 != file.size() {
                return Err(ReadError::SizeMismatch {
                    name: file.name().to_string(),
                    expected: file.size(),
                    actual: data.len() as u64,
                });
            }
            Ok(Bytes::from(data))
        }
    }
}

/// A parsed `data:<mime>;base64,<payload>` transport text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub media_type: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Split transport text into media type and raw base64 payload.
    pub fn parse(text: &'a str) -> Result<Self, ReadError> {
        let rest = text.strip_prefix(DATA_URI_SCHEME).ok_or_else(|| {
            ReadError::MalformedTransportText("missing 'data:' scheme".to_string())
        })?;
        let marker = rest.find(BASE64_MARKER).ok_or_else(|| {
            ReadError::MalformedTransportText("missing ';base64,' marker".to_string())
        })?;

        let media_type = &rest[..marker];
        let payload = &rest[marker + BASE64_MARKER.len()..];
        if media_type.is_empty() {
            return Err(ReadError::MalformedTransportText(
                "empty media type".to_string(),
            ));
        }
        if payload.is_empty() {
            return Err(ReadError::MalformedTransportText(
                "empty payload".to_string(),
            ));
        }

        Ok(Self {
            media_type,
            payload,
        })
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>, ReadError> {
        base64::engine::general_purpose::STANDARD
            .decode(self.payload)
            .map_err(|e| ReadError::MalformedTransportText(format!("invalid base64: {}", e)))
    }
}

// ============================================================================
// Preview handles
// ============================================================================

/// Opaque display handle for an image, owned by whoever holds it.
///
/// Not `Clone`: releasing consumes the handle, so each one is released at
/// most once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PreviewHandle {
    id: u64,
}

impl PreviewHandle {
    /// Mint a handle. Hosts are responsible for keeping ids unique.
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// The presentation-side owner of preview resources.
pub trait PreviewHost: Send + Sync {
    /// Allocate a display handle for the file.
    fn create_preview(&self, file: &ImageFile) -> PreviewHandle;

    /// Free the resource behind a handle.
    fn release_preview(&self, handle: PreviewHandle);
}

/// Preview host for targets with nothing to render; release is a no-op.
#[derive(Debug, Default)]
pub struct DetachedPreviews {
    next_id: AtomicU64,
}

impl DetachedPreviews {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreviewHost for DetachedPreviews {
    fn create_preview(&self, _file: &ImageFile) -> PreviewHandle {
        PreviewHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn release_preview(&self, _handle: PreviewHandle) {}
}

/// Create a preview handle for `file` on the given host. The caller owns the
/// handle and must hand it back to [`PreviewHost::release_preview`].
pub fn create_preview_handle(host: &dyn PreviewHost, file: &ImageFile) -> PreviewHandle {
    host.create_preview(file)
}
