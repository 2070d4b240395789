//! Plant Doctor - Application Library
//!
//! Upload a photo of a plant, get a structured diagnosis back. It includes:
//! - Configuration models and the JSON config loader
//! - The diagnosis client and the analysis session state machine
//! - Result rendering and error types

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export the types a presentation layer needs
pub use models::settings::AppConfig;
pub use services::{
    AnalysisFailure, AnalysisPhase, AnalysisSession, AnalysisState, DiagnosisClient,
    SessionError,
};
pub use storage::config::ConfigService;
pub use utils::error::{AppError, AppResult};
