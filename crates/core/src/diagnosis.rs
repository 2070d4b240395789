//! Diagnosis Result Model
//!
//! The typed diagnosis extracted from a model reply, and the lenient parsing
//! that gets it out of free-form text. Only the recognized keys are read;
//! anything else in the reply is ignored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Keys that name the condition, in lookup order
const CONDITION_KEYS: [&str; 3] = ["disease", "condition", "pest"];

/// Marker the model uses for a plant with no issues
pub const HEALTHY_MARKER: &str = "Healthy";

/// How bad the condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("Unknown severity: {}", other)),
        }
    }
}

/// A structured diagnosis. Every field may be missing from the reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Percentage, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    /// Whether the model reported the plant as healthy.
    pub fn is_healthy(&self) -> bool {
        self.condition
            .as_deref()
            .map(|c| c.trim().eq_ignore_ascii_case(HEALTHY_MARKER))
            .unwrap_or(false)
    }

    /// Map a parsed JSON object onto the result, dropping what doesn't fit.
    pub fn from_value(value: &Value) -> Result<Self, ReplyParseError> {
        let obj = value.as_object().ok_or(ReplyParseError::NotAnObject)?;

        let condition = CONDITION_KEYS
            .iter()
            .filter_map(|key| obj.get(*key))
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string);

        let severity = obj.get("severity").and_then(|v| match v.as_str() {
            Some(s) => match s.parse::<Severity>() {
                Ok(sev) => Some(sev),
                Err(e) => {
                    tracing::warn!("[Diagnosis] Ignoring severity: {}", e);
                    None
                }
            },
            None => None,
        });

        let confidence = obj.get("confidence").and_then(parse_confidence);

        let recommendations = match obj.get("recommendations") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) if !single.trim().is_empty() => {
                vec![single.trim().to_string()]
            }
            _ => Vec::new(),
        };

        Ok(Self {
            condition,
            severity,
            confidence,
            recommendations,
        })
    }
}

fn parse_confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;

    if (0.0..=100.0).contains(&raw) {
        Some(raw)
    } else {
        tracing::warn!("[Diagnosis] Ignoring out-of-range confidence: {}", raw);
        None
    }
}

/// Why a reply did not yield a diagnosis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyParseError {
    #[error("reply was empty")]
    EmptyReply,

    #[error("no JSON object found in reply")]
    NoJsonObject,

    #[error("invalid JSON in reply: {0}")]
    InvalidJson(String),

    #[error("reply JSON is not an object")]
    NotAnObject,
}

/// Top-level `{...}` spans in `text`, in order of appearance.
///
/// Braces inside JSON strings are skipped once a span is open. Text outside
/// any span is treated as prose, so stray quotes there don't matter. An
/// unbalanced trailing span is not returned.
fn find_json_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if depth > 0 && in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push(&text[start..=i]);
                }
            }
            '"' if depth > 0 => in_string = true,
            _ => {}
        }
    }

    spans
}

/// Parse a model reply into a diagnosis.
///
/// Tries each top-level `{...}` span in order and uses the first one that is
/// valid JSON. Never invents a result: a reply without one is an error.
pub fn parse_diagnosis_reply(text: &str) -> Result<AnalysisResult, ReplyParseError> {
    if text.trim().is_empty() {
        return Err(ReplyParseError::EmptyReply);
    }

    let candidates = find_json_objects(text);
    if candidates.is_empty() {
        return Err(ReplyParseError::NoJsonObject);
    }

    let mut first_error = None;
    for candidate in candidates {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return AnalysisResult::from_value(&value),
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    Err(ReplyParseError::InvalidJson(first_error.unwrap_or_default()))
}
