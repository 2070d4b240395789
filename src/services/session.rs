//! Analysis Session
//!
//! The state machine behind one upload-and-diagnose screen:
//!
//! ```text
//! Idle -> ImageSelected -> Analyzing -> Completed | Failed
//! ```
//!
//! The session owns the selected image and its preview handle. Analysis is
//! split into `begin_analysis` (state change, returns a job), `AnalysisJob::run`
//! (the async work, no access to the session) and `complete_analysis` (applies
//! the outcome). At most one job is in flight; outcomes from any other job
//! are discarded.

use std::fmt;
use std::mem;
use std::str::FromStr;
use std::sync::Arc;

use plant_doctor_core::{
    create_preview_handle, encode_to_transport_text, validate, AnalysisResult, ImageFile,
    PreviewHandle, PreviewHost, ValidationError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::diagnosis::{DiagnosisClient, DiagnosisError};

// ============================================================================
// State
// ============================================================================

/// A validated image together with its preview handle.
#[derive(Debug)]
pub struct UploadedImage {
    file: ImageFile,
    preview: PreviewHandle,
}

impl UploadedImage {
    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }
}

/// Which step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Read,
    RemoteCall,
    Parse,
}

/// A failed analysis as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub kind: FailureKind,
    /// User-facing message, rendered verbatim
    pub message: String,
    /// Model reply text, kept for parse failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl From<DiagnosisError> for AnalysisFailure {
    fn from(err: DiagnosisError) -> Self {
        let message = err.to_string();
        match err {
            DiagnosisError::Read(_) => Self {
                kind: FailureKind::Read,
                message,
                raw: None,
            },
            DiagnosisError::RemoteCall(e) => Self {
                kind: FailureKind::RemoteCall,
                message: format!(
                    "Failed to analyze image: {}. Please check your credentials and try again.",
                    e
                ),
                raw: None,
            },
            DiagnosisError::Parse { raw, .. } => Self {
                kind: FailureKind::Parse,
                message,
                raw: Some(raw),
            },
        }
    }
}

/// Session state. Exactly one is active; every non-idle state carries the image.
#[derive(Debug, Default)]
pub enum AnalysisState {
    #[default]
    Idle,
    ImageSelected(UploadedImage),
    Analyzing(UploadedImage),
    Completed(UploadedImage, AnalysisResult),
    Failed(UploadedImage, AnalysisFailure),
}

impl AnalysisState {
    pub fn phase(&self) -> AnalysisPhase {
        match self {
            AnalysisState::Idle => AnalysisPhase::Idle,
            AnalysisState::ImageSelected(_) => AnalysisPhase::ImageSelected,
            AnalysisState::Analyzing(_) => AnalysisPhase::Analyzing,
            AnalysisState::Completed(..) => AnalysisPhase::Completed,
            AnalysisState::Failed(..) => AnalysisPhase::Failed,
        }
    }

    /// The image held by this state, if any
    pub fn upload(&self) -> Option<&UploadedImage> {
        match self {
            AnalysisState::Idle => None,
            AnalysisState::ImageSelected(upload)
            | AnalysisState::Analyzing(upload)
            | AnalysisState::Completed(upload, _)
            | AnalysisState::Failed(upload, _) => Some(upload),
        }
    }

    fn into_upload(self) -> Option<UploadedImage> {
        match self {
            AnalysisState::Idle => None,
            AnalysisState::ImageSelected(upload)
            | AnalysisState::Analyzing(upload)
            | AnalysisState::Completed(upload, _)
            | AnalysisState::Failed(upload, _) => Some(upload),
        }
    }
}

/// Fieldless view of [`AnalysisState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    Idle,
    ImageSelected,
    Analyzing,
    Completed,
    Failed,
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisPhase::Idle => write!(f, "idle"),
            AnalysisPhase::ImageSelected => write!(f, "image_selected"),
            AnalysisPhase::Analyzing => write!(f, "analyzing"),
            AnalysisPhase::Completed => write!(f, "completed"),
            AnalysisPhase::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for AnalysisPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AnalysisPhase::Idle),
            "image_selected" => Ok(AnalysisPhase::ImageSelected),
            "analyzing" => Ok(AnalysisPhase::Analyzing),
            "completed" => Ok(AnalysisPhase::Completed),
            "failed" => Ok(AnalysisPhase::Failed),
            _ => Err(format!("Unknown analysis phase: {}", s)),
        }
    }
}

/// Operations the session refuses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The image did not pass validation; state is unchanged
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("An analysis is already in progress")]
    SessionBusy,

    #[error("No image selected")]
    NoImageSelected,

    #[error("Analysis already completed; select a new image or reset")]
    AlreadyCompleted,
}

// ============================================================================
// Jobs
// ============================================================================

/// One in-flight analysis. Owns everything it needs to run.
pub struct AnalysisJob {
    id: u64,
    file: ImageFile,
    client: Arc<DiagnosisClient>,
}

impl AnalysisJob {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Encode the image, then diagnose it.
    pub async fn run(self) -> AnalysisOutcome {
        let result = match encode_to_transport_text(&self.file).await {
            Ok(transport_text) => self.client.diagnose(&transport_text).await,
            Err(e) => Err(DiagnosisError::Read(e)),
        };
        AnalysisOutcome {
            job_id: self.id,
            result,
        }
    }
}

/// What a finished job produced, tagged with its job id.
#[derive(Debug)]
pub struct AnalysisOutcome {
    job_id: u64,
    result: Result<AnalysisResult, DiagnosisError>,
}

impl AnalysisOutcome {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }
}

// ============================================================================
// Session
// ============================================================================

/// Single-owner analysis session
pub struct AnalysisSession {
    state: AnalysisState,
    client: Arc<DiagnosisClient>,
    previews: Arc<dyn PreviewHost>,
    next_job_id: u64,
    in_flight: Option<u64>,
}

impl AnalysisSession {
    pub fn new(client: Arc<DiagnosisClient>, previews: Arc<dyn PreviewHost>) -> Self {
        Self {
            state: AnalysisState::Idle,
            client,
            previews,
            next_job_id: 1,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.state.phase()
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.state.upload()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            AnalysisState::Completed(_, result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&AnalysisFailure> {
        match &self.state {
            AnalysisState::Failed(_, failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, AnalysisState::Analyzing(_))
    }

    /// Validate `file` and make it the current image.
    ///
    /// Any previous image, result or failure is dropped and its preview
    /// handle released. A rejected file leaves the session untouched.
    pub fn select_image(&mut self, file: ImageFile) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::SessionBusy);
        }

        if let Err(e) = validate(&file) {
            tracing::info!("[Session] Rejected '{}': {}", file.name(), e);
            return Err(e.into());
        }

        let from = self.phase();
        self.release_current();
        let preview = create_preview_handle(self.previews.as_ref(), &file);
        tracing::debug!(
            "[Session] {} -> image_selected ('{}', {})",
            from,
            file.name(),
            file.display_size()
        );
        self.state = AnalysisState::ImageSelected(UploadedImage { file, preview });
        Ok(())
    }

    /// Move to `Analyzing` and hand out the job to run.
    ///
    /// Returns `Ok(None)` while a job is already in flight.
    pub fn begin_analysis(&mut self) -> Result<Option<AnalysisJob>, SessionError> {
        let (next, outcome) = match mem::take(&mut self.state) {
            AnalysisState::ImageSelected(upload) | AnalysisState::Failed(upload, _) => {
                let id = self.next_job_id;
                self.next_job_id += 1;
                self.in_flight = Some(id);
                tracing::debug!("[Session] -> analyzing (job {})", id);
                let job = AnalysisJob {
                    id,
                    file: upload.file.clone(),
                    client: Arc::clone(&self.client),
                };
                (AnalysisState::Analyzing(upload), Ok(Some(job)))
            }
            state @ AnalysisState::Analyzing(_) => {
                tracing::debug!("[Session] Analysis already running, ignoring request");
                (state, Ok(None))
            }
            state @ AnalysisState::Idle => (state, Err(SessionError::NoImageSelected)),
            state @ AnalysisState::Completed(..) => (state, Err(SessionError::AlreadyCompleted)),
        };
        self.state = next;
        outcome
    }

    /// Apply a finished job's outcome. Returns `false` if it is not the
    /// in-flight job's.
    ///
    /// The session stays `Analyzing` until its own job's outcome arrives, so
    /// a job that is never completed keeps the session busy.
    pub fn complete_analysis(&mut self, outcome: AnalysisOutcome) -> bool {
        if self.in_flight != Some(outcome.job_id) {
            tracing::debug!("[Session] Discarding stale outcome of job {}", outcome.job_id);
            return false;
        }

        match mem::take(&mut self.state) {
            AnalysisState::Analyzing(upload) => {
                self.in_flight = None;
                self.state = match outcome.result {
                    Ok(result) => {
                        tracing::debug!("[Session] job {} -> completed", outcome.job_id);
                        AnalysisState::Completed(upload, result)
                    }
                    Err(e) => {
                        let failure = AnalysisFailure::from(e);
                        tracing::warn!(
                            "[Session] job {} -> failed ({:?}): {}",
                            outcome.job_id,
                            failure.kind,
                            failure.message
                        );
                        AnalysisState::Failed(upload, failure)
                    }
                };
                true
            }
            state => {
                self.state = state;
                false
            }
        }
    }

    /// Begin, run and complete an analysis in one call.
    pub async fn analyze(&mut self) -> Result<AnalysisPhase, SessionError> {
        if let Some(job) = self.begin_analysis()? {
            let outcome = job.run().await;
            self.complete_analysis(outcome);
        }
        Ok(self.phase())
    }

    /// Clear everything and return to `Idle`.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::SessionBusy);
        }
        self.release_current();
        tracing::debug!("[Session] -> idle");
        Ok(())
    }

    /// Leave `Idle` behind, releasing the preview handle of the old state.
    fn release_current(&mut self) {
        if let Some(upload) = mem::take(&mut self.state).into_upload() {
            self.previews.release_preview(upload.preview);
        }
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        self.release_current();
    }
}
