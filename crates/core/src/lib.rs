//! Plant Doctor Core
//!
//! Domain types shared by the Plant Doctor workspace: the uploaded image
//! model, upload validation, transport encoding, preview handles and the
//! diagnosis result with its reply parser. Nothing here talks to the network.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`ValidationError`, `ReadError`, `CoreError`)
//! - `image` - `ImageFile` and MIME helpers
//! - `validation` - Format and size policy
//! - `encoding` - Data-URI transport text and preview handles
//! - `diagnosis` - `AnalysisResult` and reply parsing
//! - `proxy` - Proxy configuration shared with the HTTP provider

pub mod diagnosis;
pub mod encoding;
pub mod error;
pub mod image;
pub mod proxy;
pub mod validation;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult, ReadError, ValidationError};

// ── Image Model ────────────────────────────────────────────────────────
pub use self::image::{format_file_size, ImageFile, ImageSource};

// ── Validation & Encoding ──────────────────────────────────────────────
pub use encoding::{
    create_preview_handle, encode_to_transport_text, DataUri, DetachedPreviews, PreviewHandle,
    PreviewHost,
};
pub use validation::{validate, ALLOWED_MIME_TYPES, MAX_FILE_SIZE};

// ── Diagnosis ──────────────────────────────────────────────────────────
pub use diagnosis::{parse_diagnosis_reply, AnalysisResult, ReplyParseError, Severity};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
