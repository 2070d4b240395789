//! Upload Integration Tests
//!
//! Images read from disk: metadata, validation and the lazy read at encode time.

use std::fs;

use plant_doctor::services::{AnalysisPhase, FailureKind, SessionError};
use plant_doctor_core::{
    encode_to_transport_text, validate, DataUri, ImageFile, ReadError, ValidationError,
};

use crate::support::{session_with, CountingPreviews, ScriptedProvider, LEAF_BLIGHT_REPLY};

const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[tokio::test]
async fn test_disk_image_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Tomato Leaf.JPG");
    fs::write(&path, vec![0xFFu8; 1536]).unwrap();

    let file = ImageFile::from_path(&path).await.unwrap();
    assert_eq!(file.name(), "Tomato Leaf.JPG");
    assert_eq!(file.mime_type(), "image/jpeg");
    assert_eq!(file.size(), 1536);
    assert_eq!(file.display_size(), "1.5 KB");
    assert!(validate(&file).is_ok());
}

#[tokio::test]
async fn test_disk_image_is_analyzed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.png");
    let mut bytes = PNG_HEADER.to_vec();
    bytes.extend(std::iter::repeat(7u8).take(4096));
    fs::write(&path, &bytes).unwrap();

    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let mut session = session_with(provider.clone(), CountingPreviews::new());
    session
        .select_image(ImageFile::from_path(&path).await.unwrap())
        .unwrap();

    assert_eq!(session.analyze().await, Ok(AnalysisPhase::Completed));
    let (media_type, payload) = provider.images_sent().remove(0);
    assert_eq!(media_type, "image/png");
    let transport = format!("data:{};base64,{}", media_type, payload);
    assert_eq!(DataUri::parse(&transport).unwrap().decode().unwrap(), bytes);
}

#[tokio::test]
async fn test_vanished_file_fails_with_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaf.webp");
    fs::write(&path, vec![1u8; 512]).unwrap();

    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let mut session = session_with(provider.clone(), CountingPreviews::new());
    session
        .select_image(ImageFile::from_path(&path).await.unwrap())
        .unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(session.analyze().await, Ok(AnalysisPhase::Failed));
    let failure = session.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Read);
    assert!(failure.message.contains("leaf.webp"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_oversized_disk_file_rejected_without_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.jpg");
    let handle = fs::File::create(&path).unwrap();
    handle.set_len(6 * 1024 * 1024).unwrap();

    let mut session = session_with(ScriptedProvider::new(vec![]), CountingPreviews::new());
    let err = session
        .select_image(ImageFile::from_path(&path).await.unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::FileTooLarge { size, .. }) if size == 6 * 1024 * 1024
    ));
    assert_eq!(session.phase(), AnalysisPhase::Idle);
}

#[tokio::test]
async fn test_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = ImageFile::from_path(dir.path().join("absent.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReadError::Io { .. }));
}

#[tokio::test]
async fn test_unknown_extension_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    fs::write(&path, b"%PDF-1.4").unwrap();

    let file = ImageFile::from_path(&path).await.unwrap();
    assert_eq!(file.mime_type(), "application/octet-stream");
    assert_eq!(
        validate(&file),
        Err(ValidationError::UnsupportedFormat {
            mime_type: "application/octet-stream".to_string()
        })
    );

    // Encoding still works on anything readable; only validation gates it
    let transport = encode_to_transport_text(&file).await.unwrap();
    assert!(transport.starts_with("data:application/octet-stream;base64,"));
}
