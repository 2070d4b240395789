//! Result Rendering
//!
//! Plain-text rendering of a diagnosis, in the order a results panel shows
//! it: condition, severity, confidence, then numbered recommendations.

use std::fmt::Write;

use plant_doctor_core::AnalysisResult;

use super::session::AnalysisFailure;

/// Render a diagnosis for the terminal. Absent fields are left out.
pub fn render_result(result: &AnalysisResult) -> String {
    let mut out = String::from("Analysis Results\n");

    if let Some(condition) = &result.condition {
        let _ = writeln!(out, "Condition: {}", condition);
    }
    if let Some(severity) = result.severity {
        let _ = writeln!(out, "Severity: {}", severity);
    }
    if let Some(confidence) = result.confidence {
        // Parsed confidence is already within 0..=100
        let _ = writeln!(out, "Confidence: {}%", confidence.round() as u32);
    }
    if !result.recommendations.is_empty() {
        out.push_str("Recommendations:\n");
        for (i, rec) in result.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, rec);
        }
    }

    out
}

/// Render a failure the way the user sees it.
pub fn render_failure(failure: &AnalysisFailure) -> String {
    format!("Error: {}", failure.message)
}
