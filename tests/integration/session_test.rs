//! Analysis Session Integration Tests
//!
//! Full upload -> analyze -> result flows through the public session API.

use plant_doctor::services::{AnalysisPhase, AnalysisState, FailureKind, SessionError};
use plant_doctor_core::{DataUri, ImageFile, Severity, ValidationError, MAX_FILE_SIZE};
use plant_doctor_llm::LlmError;

use crate::support::{jpeg, session_with, CountingPreviews, ScriptedProvider, LEAF_BLIGHT_REPLY};

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_two_megabyte_jpeg_is_diagnosed() {
    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let previews = CountingPreviews::new();
    let mut session = session_with(provider.clone(), previews.clone());

    session.select_image(jpeg("leaf.jpg", 2 * 1024 * 1024)).unwrap();
    assert_eq!(session.phase(), AnalysisPhase::ImageSelected);

    assert_eq!(session.analyze().await, Ok(AnalysisPhase::Completed));
    assert_eq!(provider.calls(), 1);

    let result = session.result().unwrap();
    assert_eq!(result.condition.as_deref(), Some("Leaf Blight"));
    assert_eq!(result.severity, Some(Severity::High));
    assert_eq!(result.confidence, Some(92.0));
    assert_eq!(
        result.recommendations,
        vec!["Remove affected leaves", "Apply copper fungicide"]
    );
    assert!(!result.is_healthy());
    assert_eq!(session.image().unwrap().file().name(), "leaf.jpg");
}

#[tokio::test]
async fn test_sent_image_decodes_to_original_bytes() {
    let provider = ScriptedProvider::replying(r#"{"disease": "Healthy"}"#);
    let previews = CountingPreviews::new();
    let mut session = session_with(provider.clone(), previews);

    let original: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    session
        .select_image(ImageFile::from_bytes("leaf.webp", "image/webp", original.clone()))
        .unwrap();
    session.analyze().await.unwrap();
    assert!(session.result().unwrap().is_healthy());

    let sent = provider.images_sent();
    assert_eq!(sent.len(), 1);
    let (media_type, payload) = &sent[0];
    assert_eq!(media_type, "image/webp");

    let transport = format!("data:{};base64,{}", media_type, payload);
    let decoded = DataUri::parse(&transport).unwrap().decode().unwrap();
    assert_eq!(decoded, original);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_reply_without_json_fails_with_parse_error() {
    let provider = ScriptedProvider::replying("I cannot determine a diagnosis.");
    let previews = CountingPreviews::new();
    let mut session = session_with(provider.clone(), previews);

    session.select_image(jpeg("leaf.jpg", 1024)).unwrap();
    assert_eq!(session.analyze().await, Ok(AnalysisPhase::Failed));

    let failure = session.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::Parse);
    assert_eq!(failure.raw.as_deref(), Some("I cannot determine a diagnosis."));
    assert!(session.result().is_none());
    // The image stays selected so the user can retry
    assert!(session.image().is_some());
}

#[tokio::test]
async fn test_remote_failure_then_successful_retry() {
    let provider = ScriptedProvider::new(vec![
        Err(LlmError::AuthenticationFailed {
            message: "bedrock: The security token included in the request is invalid".to_string(),
        }),
        Ok(LEAF_BLIGHT_REPLY.to_string()),
    ]);
    let previews = CountingPreviews::new();
    let mut session = session_with(provider.clone(), previews.clone());

    session.select_image(jpeg("leaf.jpg", 1024)).unwrap();
    assert_eq!(session.analyze().await, Ok(AnalysisPhase::Failed));
    let failure = session.failure().unwrap();
    assert_eq!(failure.kind, FailureKind::RemoteCall);
    assert!(failure.message.contains("security token"));
    assert!(failure.message.contains("check your credentials"));

    assert_eq!(session.analyze().await, Ok(AnalysisPhase::Completed));
    assert_eq!(provider.calls(), 2);
    // Retrying reuses the same image and handle
    assert_eq!(previews.created(), 1);
    assert!(previews.released().is_empty());
}

#[tokio::test]
async fn test_completed_session_refuses_second_analysis() {
    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let mut session = session_with(provider.clone(), CountingPreviews::new());

    session.select_image(jpeg("leaf.jpg", 1024)).unwrap();
    session.analyze().await.unwrap();
    assert_eq!(session.analyze().await, Err(SessionError::AlreadyCompleted));
    assert_eq!(provider.calls(), 1);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_pdf_is_rejected_and_session_stays_idle() {
    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let previews = CountingPreviews::new();
    let mut session = session_with(provider.clone(), previews.clone());

    let pdf = ImageFile::from_bytes("notes.pdf", "application/pdf", b"%PDF-1.7".to_vec());
    let err = session.select_image(pdf).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::UnsupportedFormat { .. })
    ));
    assert!(err
        .to_string()
        .starts_with("Please select a JPEG, PNG, or WebP image file"));

    assert_eq!(session.phase(), AnalysisPhase::Idle);
    assert_eq!(previews.created(), 0);
    assert_eq!(session.begin_analysis().err(), Some(SessionError::NoImageSelected));
    assert_eq!(provider.calls(), 0);
}

#[test]
fn test_size_limit_boundary() {
    let previews = CountingPreviews::new();
    let mut session = session_with(ScriptedProvider::new(vec![]), previews.clone());

    session
        .select_image(jpeg("exact.jpg", MAX_FILE_SIZE as usize))
        .unwrap();

    let err = session
        .select_image(jpeg("big.jpg", MAX_FILE_SIZE as usize + 1))
        .unwrap_err();
    assert!(err.to_string().starts_with("File size must be less than 5MB"));

    // The rejected file changed nothing
    assert_eq!(session.image().unwrap().file().name(), "exact.jpg");
    assert_eq!(previews.created(), 1);
    assert!(previews.released().is_empty());
}

// ============================================================================
// Preview handles
// ============================================================================

#[tokio::test]
async fn test_selecting_new_image_clears_result_and_releases_handle() {
    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let previews = CountingPreviews::new();
    let mut session = session_with(provider, previews.clone());

    session.select_image(jpeg("first.jpg", 1024)).unwrap();
    let first_id = session.image().unwrap().preview().id();
    session.analyze().await.unwrap();
    assert!(session.result().is_some());

    session.select_image(jpeg("second.jpg", 2048)).unwrap();
    assert_eq!(session.phase(), AnalysisPhase::ImageSelected);
    assert!(session.result().is_none());
    assert_eq!(previews.released(), vec![first_id]);
    assert_ne!(session.image().unwrap().preview().id(), first_id);
}

#[tokio::test]
async fn test_selecting_after_failure_clears_failure() {
    let provider = ScriptedProvider::replying("no diagnosis available");
    let previews = CountingPreviews::new();
    let mut session = session_with(provider, previews.clone());

    session.select_image(jpeg("blurry.jpg", 1024)).unwrap();
    let first_id = session.image().unwrap().preview().id();
    assert_eq!(session.analyze().await, Ok(AnalysisPhase::Failed));
    assert!(session.failure().is_some());

    session.select_image(jpeg("sharp.jpg", 1024)).unwrap();
    assert_eq!(session.phase(), AnalysisPhase::ImageSelected);
    assert!(session.failure().is_none());
    assert!(session.result().is_none());
    assert_eq!(previews.released(), vec![first_id]);
    assert_eq!(session.image().unwrap().file().name(), "sharp.jpg");
}

#[test]
fn test_replacing_selected_image_releases_first_handle() {
    let previews = CountingPreviews::new();
    let mut session = session_with(ScriptedProvider::new(vec![]), previews.clone());

    session.select_image(jpeg("first.jpg", 1024)).unwrap();
    let first_id = session.image().unwrap().preview().id();
    session.select_image(jpeg("second.jpg", 1024)).unwrap();

    assert_eq!(session.phase(), AnalysisPhase::ImageSelected);
    assert_eq!(previews.created(), 2);
    assert_eq!(previews.released(), vec![first_id]);
    assert_eq!(session.image().unwrap().file().name(), "second.jpg");
}

#[tokio::test]
async fn test_reset_from_completed_releases_exactly_once() {
    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let previews = CountingPreviews::new();
    let mut session = session_with(provider, previews.clone());

    session.select_image(jpeg("leaf.jpg", 1024)).unwrap();
    session.analyze().await.unwrap();
    assert_eq!(session.phase(), AnalysisPhase::Completed);

    session.reset().unwrap();
    assert!(matches!(session.state(), AnalysisState::Idle));
    assert_eq!(previews.released().len(), 1);

    // Reset from Idle and dropping the session release nothing more
    session.reset().unwrap();
    drop(session);
    assert_eq!(previews.released().len(), 1);
}

#[test]
fn test_dropping_session_releases_handle() {
    let previews = CountingPreviews::new();
    let mut session = session_with(ScriptedProvider::new(vec![]), previews.clone());
    session.select_image(jpeg("leaf.jpg", 1024)).unwrap();

    drop(session);
    assert_eq!(previews.released().len(), 1);
}

// ============================================================================
// Single flight
// ============================================================================

#[tokio::test]
async fn test_single_flight() {
    let provider = ScriptedProvider::replying(LEAF_BLIGHT_REPLY);
    let mut session = session_with(provider.clone(), CountingPreviews::new());
    session.select_image(jpeg("leaf.jpg", 1024)).unwrap();

    let job = session.begin_analysis().unwrap().unwrap();
    assert_eq!(session.phase(), AnalysisPhase::Analyzing);
    assert!(session.begin_analysis().unwrap().is_none());
    assert!(session.begin_analysis().unwrap().is_none());

    // Read access while the job runs
    assert_eq!(session.image().unwrap().file().name(), "leaf.jpg");
    assert_eq!(session.select_image(jpeg("other.jpg", 10)), Err(SessionError::SessionBusy));
    assert_eq!(session.reset(), Err(SessionError::SessionBusy));

    let outcome = job.run().await;
    assert!(session.complete_analysis(outcome));
    assert_eq!(session.phase(), AnalysisPhase::Completed);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_repeated_begin_while_running_makes_one_call() {
    let provider = ScriptedProvider::new(vec![
        Ok(LEAF_BLIGHT_REPLY.to_string()),
        Ok(r#"{"disease": "Rust"}"#.to_string()),
    ]);
    let mut session = session_with(provider.clone(), CountingPreviews::new());
    session.select_image(jpeg("leaf.jpg", 1024)).unwrap();

    let job = session.begin_analysis().unwrap().unwrap();
    let running = tokio::spawn(job.run());

    for _ in 0..3 {
        assert!(session.begin_analysis().unwrap().is_none());
        tokio::task::yield_now().await;
    }
    assert_eq!(session.reset(), Err(SessionError::SessionBusy));

    let outcome = running.await.unwrap();
    assert!(session.complete_analysis(outcome));
    assert_eq!(
        session.result().unwrap().condition.as_deref(),
        Some("Leaf Blight")
    );
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.peak_concurrency(), 1);
}
