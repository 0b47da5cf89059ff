//! Per-section compliance findings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse a severity label case-insensitively
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

/// Structured form of a model judgment, when the response parses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub section_summary: String,
    pub issue: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// A single per-section compliance judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Preview of the section text
    pub section: String,
    /// Raw model response (or a placeholder when the call failed)
    pub ai_analysis: String,
    /// Parsed judgment, present when the response was valid JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
    /// Model-call failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Finding {
    /// Placeholder analysis recorded when the model call fails
    pub const MODEL_FAILURE: &'static str = "Error: Could not get a response from the language model.";

    /// Finding built from a model response
    pub fn analyzed(section: String, response: String, assessment: Option<Assessment>) -> Self {
        Self {
            section,
            ai_analysis: response,
            assessment,
            error: None,
        }
    }

    /// Finding recorded when the model call failed
    pub fn failed(section: String, error: impl fmt::Display) -> Self {
        Self {
            section,
            ai_analysis: Self::MODEL_FAILURE.to_string(),
            assessment: None,
            error: Some(error.to_string()),
        }
    }

    /// Whether the model call for this section failed
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Severity, if the response carried one
    pub fn severity(&self) -> Option<Severity> {
        self.assessment.as_ref().and_then(|a| a.severity)
    }
}
