//! Best-effort parsing of model responses into a structured assessment
//!
//! Models are asked for a JSON object but often wrap it in a markdown fence or
//! surround it with prose. Parsing never fails the pipeline: anything that does
//! not yield a JSON object simply has no assessment.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::types::{Assessment, Severity};

const FIELDS: [&str; 4] = ["section_summary", "issue", "reference", "severity"];

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Candidate JSON payloads, most specific first
fn candidates(response: &str) -> Vec<&str> {
    let mut out = Vec::new();
    if let Some(caps) = fence_regex().and_then(|re| re.captures(response)) {
        if let Some(body) = caps.get(1) {
            out.push(body.as_str());
        }
    }
    out.push(response.trim());
    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if start < end {
            out.push(&response[start..=end]);
        }
    }
    out
}

fn field_text(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Parse a model response into an `Assessment`, if it contains a usable JSON object
pub fn parse_assessment(response: &str) -> Option<Assessment> {
    let object = candidates(response).into_iter().find_map(|candidate| {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })?;

    if !FIELDS.iter().any(|f| object.contains_key(*f)) {
        return None;
    }

    Some(Assessment {
        section_summary: field_text(&object, "section_summary"),
        issue: field_text(&object, "issue"),
        reference: field_text(&object, "reference"),
        severity: object
            .get("severity")
            .and_then(Value::as_str)
            .and_then(Severity::parse),
    })
}
