//! Required-document checklist verification
//!
//! A required document counts as present when its normalized name is a
//! substring of any normalized processed reference file stem. This is a
//! containment heuristic, so unrelated files can produce false positives.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ChecklistResult;

/// Lower-case and keep only ASCII letters and digits
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Entity type label -> required document names
#[derive(Debug, Clone, Default)]
pub struct Checklist {
    entries: HashMap<String, Vec<String>>,
}

impl Checklist {
    /// Build from an in-memory map
    pub fn from_entries(entries: HashMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    /// Load the checklist JSON object
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Checklist file not found: {} ({})", path.display(), e))
        })?;
        let entries: HashMap<String, Vec<String>> = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("Invalid checklist JSON in {}: {}", path.display(), e))
        })?;
        tracing::info!("Checklist loaded ({} entity types)", entries.len());
        Ok(Self { entries })
    }

    /// Load, logging and falling back to an empty checklist on failure
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::error!("{}", e);
            Self::default()
        })
    }

    /// Required documents for an entity type
    pub fn required(&self, entity_type: &str) -> Option<&[String]> {
        self.entries.get(entity_type).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stems of the processed `*.txt` reference files; a missing directory yields none
pub fn processed_stems(dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read processed texts {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut stems: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    stems.sort();
    stems
}

/// Split `required` into present / missing against the processed file stems
///
/// Required names that normalize identically are collapsed; the last spelling
/// wins but keeps the position of the first.
pub fn verify_against(required: &[String], processed: &[String]) -> ChecklistResult {
    let mut unique: Vec<(String, String)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for doc in required {
        let key = normalize_name(doc);
        match index.get(&key) {
            Some(&i) => unique[i].1 = doc.clone(),
            None => {
                index.insert(key.clone(), unique.len());
                unique.push((key, doc.clone()));
            }
        }
    }

    let processed: Vec<String> = processed.iter().map(|name| normalize_name(name)).collect();

    let mut result = ChecklistResult::default();
    for (key, doc) in unique {
        if processed.iter().any(|name| name.contains(key.as_str())) {
            result.present.push(doc);
        } else {
            result.missing.push(doc);
        }
    }
    result
}

/// Checks an entity type's checklist against the processed reference corpus
pub struct ChecklistVerifier {
    checklist: Checklist,
    processed_dir: PathBuf,
}

impl ChecklistVerifier {
    pub fn new(checklist: Checklist, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            checklist,
            processed_dir: processed_dir.into(),
        }
    }

    /// Present / missing split; an unknown entity type yields two empty lists
    pub fn verify(&self, entity_type: &str) -> ChecklistResult {
        let Some(required) = self.checklist.required(entity_type) else {
            tracing::warn!("No checklist found for entity type: {}", entity_type);
            return ChecklistResult::default();
        };

        let result = verify_against(required, &processed_stems(&self.processed_dir));
        tracing::info!(
            "Checklist for {}: {} present, {} missing",
            entity_type,
            result.present.len(),
            result.missing.len()
        );
        result
    }
}
