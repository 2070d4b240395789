//! Image File Model
//!
//! The binary payload a user picked, plus the metadata the validator and the
//! encoder need. Bytes are either held in memory or read lazily from disk.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::error::ReadError;

/// Fallback MIME type for anything we cannot identify
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Leading bytes read from disk to recognise the format
const SNIFF_LEN: u64 = 16;

/// Where the bytes of an [`ImageFile`] live.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Already resident in memory
    Memory(Bytes),
    /// On disk; read when the image is encoded
    Path(PathBuf),
}

/// A user-selected image file.
#[derive(Debug, Clone, Serialize)]
pub struct ImageFile {
    name: String,
    size: u64,
    mime_type: String,
    #[serde(skip)]
    source: ImageSource,
}

impl ImageFile {
    /// Build an in-memory file with explicit metadata.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            source: ImageSource::Memory(bytes),
        }
    }

    /// Describe a file on disk.
    ///
    /// Reads the metadata and the first few bytes. The MIME type comes from
    /// the magic bytes when they name a known format, otherwise from the
    /// extension. The full contents are read by the encoder.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        let metadata = tokio::fs::metadata(path).await.map_err(|e| ReadError::Io {
            name: name.clone(),
            source: e,
        })?;
        if !metadata.is_file() {
            return Err(ReadError::Io {
                name,
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            });
        }

        let header = read_header(path).await.map_err(|e| ReadError::Io {
            name: name.clone(),
            source: e,
        })?;
        let by_extension = mime_type_from_extension(&get_extension(path));
        let mime_type = match sniff_mime_type(&header) {
            Some(sniffed) => {
                if sniffed != by_extension {
                    tracing::debug!(
                        "[ImageFile] '{}' looks like {} despite its extension",
                        name,
                        sniffed
                    );
                }
                sniffed
            }
            None => by_extension,
        };

        Ok(Self {
            mime_type: mime_type.to_string(),
            name,
            size: metadata.len(),
            source: ImageSource::Path(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    /// Human readable size, e.g. `812 B`, `14.2 KB`, `2.0 MB`.
    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

async fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut header).await?;
    Ok(header)
}

/// MIME type named by the magic bytes at the start of `bytes`, if known.
fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    ::image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}

fn get_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Map a lowercase file extension to an image MIME type.
pub fn mime_type_from_extension(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => UNKNOWN_MIME_TYPE,
    }
}

/// Format a file size in human-readable form
pub fn format_file_size(size: u64) -> String {
    if size < 1024 {
        format!("{} B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
    }
}
