//! Services
//!
//! Business logic services for the application.
//! Services are driven by the CLI and own no I/O beyond the provider call.

pub mod diagnosis;
pub mod report;
pub mod session;

pub use diagnosis::{create_provider, DiagnosisClient, DiagnosisError, DIAGNOSIS_PROMPT};
pub use report::{render_failure, render_result};
pub use session::{
    AnalysisFailure, AnalysisJob, AnalysisOutcome, AnalysisPhase, AnalysisSession, AnalysisState,
    FailureKind, SessionError, UploadedImage,
};
